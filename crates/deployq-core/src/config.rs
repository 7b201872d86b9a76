use crate::error::{DeployqError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "deployq.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BoardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

fn default_api_base() -> String {
    "https://api.trello.com".to_string()
}

// ---------------------------------------------------------------------------
// ListNames
// ---------------------------------------------------------------------------

/// Display names of the three board lists. Resolved to ids once at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNames {
    #[serde(default = "default_queue_list")]
    pub queue: String,
    #[serde(default = "default_running_list")]
    pub running: String,
    #[serde(default = "default_done_list")]
    pub done: String,
}

fn default_queue_list() -> String {
    "In Line".to_string()
}

fn default_running_list() -> String {
    "Deploying".to_string()
}

fn default_done_list() -> String {
    "Completed".to_string()
}

impl Default for ListNames {
    fn default() -> Self {
        Self {
            queue: default_queue_list(),
            running: default_running_list(),
            done: default_done_list(),
        }
    }
}

// ---------------------------------------------------------------------------
// PatienceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatienceConfig {
    /// How long the up-next user has to start before being escalated.
    #[serde(default = "default_notify_secs")]
    pub notify_secs: u64,
    /// How long a deploy may run before a public nudge.
    #[serde(default = "default_deploy_secs")]
    pub deploy_secs: u64,
}

fn default_notify_secs() -> u64 {
    5 * 60
}

fn default_deploy_secs() -> u64 {
    30 * 60
}

impl Default for PatienceConfig {
    fn default() -> Self {
        Self {
            notify_secs: default_notify_secs(),
            deploy_secs: default_deploy_secs(),
        }
    }
}

impl PatienceConfig {
    pub fn notify(&self) -> Duration {
        Duration::from_secs(self.notify_secs)
    }

    pub fn deploy(&self) -> Duration {
        Duration::from_secs(self.deploy_secs)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub board: BoardConfig,
    #[serde(default)]
    pub lists: ListNames,
    #[serde(default)]
    pub patience: PatienceConfig,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Queue length above which everyone waiting gets a merge nudge. 0 disables.
    #[serde(default = "default_long_queue_threshold")]
    pub long_queue_threshold: usize,
    /// Link appended to the subject so people can fix the board by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_url: Option<String>,
}

fn default_tick_interval_ms() -> u64 {
    3_000
}

fn default_long_queue_threshold() -> usize {
    5
}

impl Config {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board: BoardConfig {
                id: board_id.into(),
                api_base: default_api_base(),
                key: None,
                token: None,
            },
            lists: ListNames::default(),
            patience: PatienceConfig::default(),
            tick_interval_ms: default_tick_interval_ms(),
            long_queue_threshold: default_long_queue_threshold(),
            board_url: None,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DeployqError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Overlay credentials and board id from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty("TRELLO_KEY") {
            self.board.key = Some(key);
        }
        if let Some(token) = non_empty("TRELLO_TOKEN") {
            self.board.token = Some(token);
        }
        if let Some(id) = non_empty("TRELLO_BOARD_ID") {
            self.board.id = id;
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.board.id.trim().is_empty() {
            warnings.push(ConfigWarning::error("board.id is empty"));
        }
        if self.board.key.as_deref().map_or(true, str::is_empty) {
            warnings.push(ConfigWarning::error(
                "board key missing: set board.key or TRELLO_KEY",
            ));
        }
        if self.board.token.as_deref().map_or(true, str::is_empty) {
            warnings.push(ConfigWarning::error(
                "board token missing: set board.token or TRELLO_TOKEN",
            ));
        }

        let names = [&self.lists.queue, &self.lists.running, &self.lists.done];
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].contains(a) {
                warnings.push(ConfigWarning::error(format!(
                    "list name '{a}' is used for more than one list"
                )));
            }
        }

        if self.tick_interval_ms == 0 {
            warnings.push(ConfigWarning::error(
                "tick_interval_ms must be greater than zero",
            ));
        } else if self.tick_interval_ms < 1_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "tick_interval_ms={} is shorter than a typical board round-trip; ticks may overlap with commands",
                    self.tick_interval_ms
                ),
            });
        }

        if self.patience.notify_secs.saturating_mul(1_000) < self.tick_interval_ms {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "patience.notify_secs={} is shorter than one tick; users will be skipped immediately",
                    self.patience.notify_secs
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
