use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use deployq_core::config::{Config, WarnLevel};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Validate the config for common mistakes
    Validate,

    /// Print the effective config (file plus environment), secrets redacted
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Validate => validate(config_path, json),
        ConfigSubcommand::Show => show(config_path, json),
    }
}

fn load_effective(config_path: &Path) -> anyhow::Result<Config> {
    let mut config = Config::load(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.apply_env();
    Ok(config)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_effective(config_path)?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "path": config_path,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn redact(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some("********".to_string());
    }
}

fn show(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let mut config = load_effective(config_path)?;
    redact(&mut config.board.key);
    redact(&mut config.board.token);

    if json {
        print_json(&config)
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_hides_only_present_secrets() {
        let mut present = Some("abc123".to_string());
        let mut absent = None;
        redact(&mut present);
        redact(&mut absent);
        assert_eq!(present.as_deref(), Some("********"));
        assert!(absent.is_none());
    }
}
