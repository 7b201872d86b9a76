pub mod config;
pub mod deploy;
pub mod serve;
pub mod state;
pub mod watch;

use anyhow::Context;
use deployq_core::config::WarnLevel;
use deployq_core::{BoardGateway, Config, Coordinator, Sink, TrelloBoard};
use std::path::Path;
use std::sync::Arc;

/// Load the config, overlay the environment, and refuse to go on if
/// validation finds errors. Warnings are logged.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config.apply_env();

    let mut errors = Vec::new();
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => errors.push(w.message),
        }
    }
    if !errors.is_empty() {
        anyhow::bail!("invalid config: {}", errors.join("; "));
    }
    Ok(config)
}

pub fn trello(config: &Config) -> anyhow::Result<Arc<dyn BoardGateway>> {
    Ok(Arc::new(TrelloBoard::from_config(&config.board)?))
}

/// Connect to the configured board for a one-shot command. Nothing is
/// listening on the sink.
pub async fn connect(config: &Config) -> anyhow::Result<Coordinator> {
    let board = trello(config)?;
    Coordinator::connect(board, config, Sink::new())
        .await
        .context("failed to resolve board lists")
}
