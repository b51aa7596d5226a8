//! Runtime configuration.
//!
//! Loaded from a TOML file with three sections:
//!
//! ```toml
//! [source]
//! base_url = "https://qradar.example.com"
//! token = "..."
//!
//! [board]
//! base_url = "https://cloud.example.com"
//! username = "soc-bot"
//! board_id = 3
//! active_stack_id = 4
//! archive_stack_id = 5
//!
//! [bridge]
//! mapping_file = "processed_offenses.txt"
//! ```
//!
//! Secrets may be supplied through the environment instead of the file; see
//! [`Config::apply_env`]. [`Config::validate`] runs before anything is
//! constructed, so an invalid file stops the process at startup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bridge::{BoardId, BridgeError, LabelName, StackId};
use deck::DeckConfig;
use engine::{
    EngineSettings, DEFAULT_ACTION_NEEDED_LABEL, DEFAULT_FINISHED_LABEL, DEFAULT_PROGRESS_COMMENT,
};
use qradar::QRadarConfig;
use serde::Deserialize;

pub const ENV_SOURCE_TOKEN: &str = "OFFENSE_DECK_SOURCE_TOKEN";
pub const ENV_SOURCE_PASSWORD: &str = "OFFENSE_DECK_SOURCE_PASSWORD";
pub const ENV_BOARD_PASSWORD: &str = "OFFENSE_DECK_BOARD_PASSWORD";

/// Top-level configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: QRadarConfig,
    pub board: BoardSection,
    #[serde(default)]
    pub bridge: BridgeSection,
}

/// `[board]`: Deck connection plus the two stacks cards live on.
#[derive(Deserialize)]
pub struct BoardSection {
    pub base_url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub board_id: BoardId,
    pub active_stack_id: StackId,
    pub archive_stack_id: StackId,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for BoardSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSection")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("board_id", &self.board_id)
            .field("active_stack_id", &self.active_stack_id)
            .field("archive_stack_id", &self.archive_stack_id)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// `[bridge]`: polling cadence, mapping location and card rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    pub mapping_file: PathBuf,
    pub poll_interval_secs: u64,
    pub due_in_hours: u32,
    pub progress_comment: String,
    pub action_needed_label: String,
    pub finished_label: String,
    pub adopt_orphans: bool,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            mapping_file: PathBuf::from("processed_offenses.txt"),
            poll_interval_secs: 20,
            due_in_hours: 5,
            progress_comment: DEFAULT_PROGRESS_COMMENT.to_string(),
            action_needed_label: DEFAULT_ACTION_NEEDED_LABEL.to_string(),
            finished_label: DEFAULT_FINISHED_LABEL.to_string(),
            adopt_orphans: true,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn invalid(message: impl Into<String>) -> BridgeError {
    BridgeError::Configuration {
        message: message.into(),
    }
}

impl Config {
    /// Reads, parses, overlays environment secrets and validates `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string without validating it.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overlays secrets from the environment; non-empty values win over the
    /// file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(token) = non_empty(ENV_SOURCE_TOKEN) {
            self.source.token = token;
        }
        if let Some(password) = non_empty(ENV_SOURCE_PASSWORD) {
            self.source.password = Some(password);
        }
        if let Some(password) = non_empty(ENV_BOARD_PASSWORD) {
            self.board.password = password;
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        self.source.validate().map_err(invalid)?;
        self.deck().validate().map_err(invalid)?;

        if self.board.active_stack_id == self.board.archive_stack_id {
            return Err(invalid(
                "board.active_stack_id and board.archive_stack_id must differ",
            ));
        }
        if self.bridge.poll_interval_secs == 0 {
            return Err(invalid("bridge.poll_interval_secs must be at least 1"));
        }
        if self.bridge.mapping_file.as_os_str().is_empty() {
            return Err(invalid("bridge.mapping_file must not be empty"));
        }
        if self.bridge.action_needed_label.is_empty() || self.bridge.finished_label.is_empty() {
            return Err(invalid("bridge label names must not be empty"));
        }
        Ok(())
    }

    /// Connection settings for the Deck adapter.
    pub fn deck(&self) -> DeckConfig {
        DeckConfig {
            base_url: self.board.base_url.clone(),
            username: self.board.username.clone(),
            password: self.board.password.clone(),
            board_id: self.board.board_id,
            accept_invalid_certs: self.board.accept_invalid_certs,
            timeout_secs: self.board.timeout_secs,
        }
    }

    /// Card rules and board layout for the engine.
    pub fn engine_settings(&self) -> Result<EngineSettings, BridgeError> {
        let action_needed = LabelName::new(self.bridge.action_needed_label.as_str())
            .ok_or_else(|| invalid("bridge.action_needed_label must not be empty"))?;
        let finished = LabelName::new(self.bridge.finished_label.as_str())
            .ok_or_else(|| invalid("bridge.finished_label must not be empty"))?;

        let mut settings = EngineSettings::new(
            self.board.active_stack_id,
            self.board.archive_stack_id,
            action_needed,
            finished,
        );
        settings.due_in_hours = self.bridge.due_in_hours;
        settings.progress_comment = self.bridge.progress_comment.clone();
        settings.adopt_orphans = self.bridge.adopt_orphans;
        Ok(settings)
    }
}
