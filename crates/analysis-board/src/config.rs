//! Configuration loading from `analysis-board.toml`.

use chess_board::TreeLimits;
use chess_core::Color;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default location of the configuration file.
pub const CONFIG_FILE: &str = "analysis-board.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub game: GameConfig,
}

/// How to launch and talk to the oracle process.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// How long to wait for an acknowledgement or a `get` result.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long `wait` blocks for a search result.
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    /// Extra attempts after an acknowledgement timeout.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Initial backoff between attempts, doubled each time.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Grace period for the process to exit after `term`.
    #[serde(default = "default_exit_timeout_ms")]
    pub exit_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_branch_limit")]
    pub branch_limit: usize,
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    /// Play against the oracle instead of analysing both sides.
    #[serde(default)]
    pub engine_on: bool,
    #[serde(default = "default_user_color")]
    pub user_color: Color,
}

fn default_oracle_path() -> PathBuf {
    PathBuf::from("oracle")
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_search_timeout_ms() -> u64 {
    30_000
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    50
}

fn default_exit_timeout_ms() -> u64 {
    1000
}

fn default_branch_limit() -> usize {
    TreeLimits::default().branch_limit
}

fn default_depth_limit() -> usize {
    TreeLimits::default().depth_limit
}

fn default_user_color() -> Color {
    Color::White
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            path: default_oracle_path(),
            args: Vec::new(),
            request_timeout_ms: default_request_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
            exit_timeout_ms: default_exit_timeout_ms(),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            branch_limit: default_branch_limit(),
            depth_limit: default_depth_limit(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            engine_on: false,
            user_color: default_user_color(),
        }
    }
}

impl BoardConfig {
    /// Load configuration from `analysis-board.toml` in the current
    /// directory. Returns the defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, falling back to the defaults when
    /// the file is missing.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }
}

impl OracleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn exit_timeout(&self) -> Duration {
        Duration::from_millis(self.exit_timeout_ms)
    }
}

impl TreeConfig {
    pub fn limits(&self) -> TreeLimits {
        TreeLimits {
            branch_limit: self.branch_limit,
            depth_limit: self.depth_limit,
        }
    }
}
