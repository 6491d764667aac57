//! Configuration management.
//!
//! Settings come from an optional TOML file layered with `PAPER_SCOUT_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `PAPER_SCOUT_CACHE__TTL_SECONDS=3600`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [http]
//! timeout_seconds = 30
//! connect_timeout_seconds = 10
//!
//! [cache]
//! enabled = true
//! directory = "/var/cache/paper-scout"
//! ttl_seconds = 86400
//!
//! [rate_limits]
//! arxiv_min_interval_ms = 0
//! biorxiv_min_interval_ms = 1000
//! pubmed_min_interval_ms = 340
//!
//! [biorxiv]
//! window_days = 365
//! window_size = 200
//!
//! [pubmed]
//! api_key = "your-ncbi-key"
//! email = "you@example.org"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the working directory and the platform config directory
pub const CONFIG_FILE_NAME: &str = "paper-scout.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PAPER_SCOUT";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Full-text cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Per-source request spacing
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// bioRxiv listing window
    #[serde(default)]
    pub biorxiv: BiorxivConfig,

    /// NCBI E-utilities settings
    #[serde(default)]
    pub pubmed: PubMedConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Overrides the default `paper-scout/<version>` user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base directory; defaults to the platform cache directory
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    86_400 // 24 hours
}

/// Minimum spacing between requests to each upstream, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub arxiv_min_interval_ms: u64,

    #[serde(default = "default_biorxiv_interval")]
    pub biorxiv_min_interval_ms: u64,

    #[serde(default = "default_pubmed_interval")]
    pub pubmed_min_interval_ms: u64,
}

impl RateLimitConfig {
    pub fn arxiv(&self) -> Duration {
        Duration::from_millis(self.arxiv_min_interval_ms)
    }

    pub fn biorxiv(&self) -> Duration {
        Duration::from_millis(self.biorxiv_min_interval_ms)
    }

    pub fn pubmed(&self) -> Duration {
        Duration::from_millis(self.pubmed_min_interval_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            arxiv_min_interval_ms: 0,
            biorxiv_min_interval_ms: default_biorxiv_interval(),
            pubmed_min_interval_ms: default_pubmed_interval(),
        }
    }
}

fn default_biorxiv_interval() -> u64 {
    1000
}

fn default_pubmed_interval() -> u64 {
    340 // NCBI allows 3 requests/second without an API key
}

/// bioRxiv listing window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiorxivConfig {
    /// Length of the listing window ending today
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Maximum number of listed entries scanned per search
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for BiorxivConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            window_size: default_window_size(),
        }
    }
}

fn default_window_days() -> u32 {
    365
}

fn default_window_size() -> usize {
    200
}

/// NCBI E-utilities configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PubMedConfig {
    /// NCBI API key (raises the upstream quota; the local spacing still applies)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Contact address sent with each request, as NCBI asks
    #[serde(default)]
    pub email: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for plain text
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(env_source())
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Configuration from environment variables and defaults only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(env_source())
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Find a config file in the working directory or the platform config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("paper-scout").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Default base directory for cached content
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("paper-scout")
}
