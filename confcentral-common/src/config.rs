//! Configuration loading and path resolution
//!
//! Bootstrap configuration comes from a TOML file. Resolution follows the
//! priority order used across the services:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file never terminates startup: a warning is logged and the
//! compiled defaults apply. A TOML file that exists but does not parse is an
//! error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CONFCENTRAL_CONFIG";

/// Environment variable naming the SQLite database file
pub const DATABASE_ENV_VAR: &str = "CONFCENTRAL_DATABASE";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file (optional, see [`resolve_database_path`])
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Period of the announcement recomputation task, in seconds
    #[serde(default = "default_announcement_interval_secs")]
    pub announcement_interval_secs: u64,

    /// SQLite busy_timeout applied to every pooled connection
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Seat registration contention retry
    #[serde(default)]
    pub registration: RetrySettings,

    /// Derived-view cache expiry
    #[serde(default)]
    pub cache: CacheSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounds for retrying a transaction aborted by store contention
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum total time spent retrying
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,
}

/// Expiry of derived-view cache entries; absent means no expiry
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct CacheSettings {
    #[serde(default)]
    pub announcement_ttl_secs: Option<u64>,

    #[serde(default)]
    pub featured_speaker_ttl_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_announcement_interval_secs() -> u64 {
    3600
}

fn default_busy_timeout_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    5
}

fn default_max_wait_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: default_bind_address(),
            port: default_port(),
            announcement_interval_secs: default_announcement_interval_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
            registration: RetrySettings::default(),
            cache: CacheSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CacheSettings {
    pub fn announcement_ttl(&self) -> Option<Duration> {
        self.announcement_ttl_secs.map(Duration::from_secs)
    }

    pub fn featured_speaker_ttl(&self) -> Option<Duration> {
        self.featured_speaker_ttl_secs.map(Duration::from_secs)
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load the bootstrap configuration
    ///
    /// `cli_arg` is the `--config` argument, if given. An explicitly named file
    /// (CLI or environment) that is missing is reported as an error; a missing
    /// platform default file falls back to compiled defaults.
    pub fn load(cli_arg: Option<&Path>) -> Result<Self> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            info!("Loading configuration from {} ({})", path.display(), CONFIG_ENV_VAR);
            return Self::from_file(&path);
        }

        // Priority 3: Platform config file
        match default_config_file() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                // Priority 4: Compiled defaults
                warn!("No configuration file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the platform configuration file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("confcentral").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/confcentral/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the database file path
///
/// Priority: CLI argument, then `CONFCENTRAL_DATABASE`, then the TOML
/// `database_path`, then the OS-dependent default.
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        return PathBuf::from(path);
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    default_database_path()
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("confcentral"))
        .unwrap_or_else(|| PathBuf::from("./confcentral_data"))
        .join("confcentral.db")
}
