use anyhow::Context;
use deployq_core::config::ListNames;
use deployq_core::{monitor, Config, Coordinator, InMemoryBoard, Sink};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEMO_BOARD: &str = "demo";
const DEMO_STEP: Duration = Duration::from_secs(8);

pub fn run(config_path: &Path, demo: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    if demo {
        return rt.block_on(run_demo());
    }

    let config = super::load_config(config_path)?;
    rt.block_on(async move {
        let board = super::trello(&config)?;
        let coordinator = Coordinator::connect(board, &config, Sink::new().with_logging())
            .await
            .context("failed to resolve board lists")?;
        monitor::run(Arc::new(coordinator), config.tick_interval(), ctrl_c()).await;
        Ok(())
    })
}

async fn ctrl_c() {
    let _ = tokio::signal::ctrl_c().await;
}

// ---------------------------------------------------------------------------
// demo
// ---------------------------------------------------------------------------

/// Run against an in-memory board with a pretend pipeline that deploys
/// whoever is up next every few seconds.
async fn run_demo() -> anyhow::Result<()> {
    let names = ListNames::default();
    let board = Arc::new(InMemoryBoard::with_lists(
        DEMO_BOARD,
        &[names.queue.as_str(), names.running.as_str(), names.done.as_str()],
    ));

    let mut config = Config::new(DEMO_BOARD);
    config.tick_interval_ms = 1_000;
    config.patience.notify_secs = 20;
    config.patience.deploy_secs = 60;
    config.long_queue_threshold = 2;

    let coordinator = Arc::new(
        Coordinator::connect(board, &config, Sink::new().with_logging()).await?,
    );
    for user in ["alice", "bob+carol", "dave"] {
        coordinator.enqueue(user).await?;
    }
    tracing::info!("demo board seeded; press Ctrl-C to stop");

    let pipeline = tokio::spawn(fake_pipeline(coordinator.clone()));
    monitor::run(coordinator, config.tick_interval(), ctrl_c()).await;
    pipeline.abort();
    Ok(())
}

async fn fake_pipeline(coordinator: Arc<Coordinator>) {
    loop {
        tokio::time::sleep(DEMO_STEP).await;
        let state = match coordinator.deployment_state().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "demo pipeline could not read the board");
                continue;
            }
        };
        let Some(user) = state
            .up_next()
            .and_then(|card| card.users().next())
            .map(str::to_string)
        else {
            continue;
        };

        if let Err(e) = coordinator.start_deploy(&user).await {
            tracing::warn!(error = %e, "demo pipeline failed to start {user}");
            continue;
        }
        tokio::time::sleep(DEMO_STEP).await;
        if let Err(e) = coordinator.mark_success(&user).await {
            tracing::warn!(error = %e, "demo pipeline failed to finish {user}");
        }
    }
}
