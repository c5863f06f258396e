//! Configuration management for Log Observer

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::TimeRange;

/// Environment variable prefix, e.g. `LOG_OBSERVER__SERVER__BASE_URL`
pub const ENV_PREFIX: &str = "LOG_OBSERVER";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend connection
    pub server: ServerConfig,

    /// Record list behaviour
    pub viewer: ViewerConfig,

    /// TUI configuration
    pub tui: TuiConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Demo backend configuration
    pub demo: DemoConfig,
}

impl Config {
    /// Load configuration: defaults, then the TOML file, then environment variables.
    ///
    /// An explicit `path` must exist. Without one, the per-user config file is used
    /// when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading configuration file");
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let config: Config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.viewer.page_size == 0 {
            return Err(crate::Error::config("viewer.page_size must be greater than zero"));
        }
        if url::Url::parse(&self.server.base_url).is_err() {
            return Err(crate::Error::config(format!(
                "server.base_url is not a valid URL: {}",
                self.server.base_url
            )));
        }
        Ok(())
    }
}

/// `<config dir>/log-observer/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "log-observer")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the observer backend
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5002".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Record list configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Records per page
    pub page_size: u32,
    /// Time window selected at startup
    pub default_time_range: TimeRange,
    /// Quiet period before a typed search is applied
    #[serde(with = "humantime_serde")]
    pub search_debounce: Duration,
    /// Delay between losing focus and closing the suggestion dropdown
    #[serde(with = "humantime_serde")]
    pub dropdown_close_delay: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            default_time_range: TimeRange::FiveMinutes,
            search_debounce: Duration::from_millis(300),
            dropdown_close_delay: Duration::from_millis(150),
        }
    }
}

/// TUI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Event loop tick rate
    #[serde(with = "humantime_serde")]
    pub tick_rate: Duration,
    /// How long an error notification stays visible
    #[serde(with = "humantime_serde")]
    pub status_ttl: Duration,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
            status_ttl: Duration::from_secs(5),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
    /// Directory for the rolling log file written while the TUI owns the terminal
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    /// Directory used for the TUI log file
    pub fn log_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "log-observer")
                .map(|dirs| dirs.data_local_dir().join("logs"))
                .unwrap_or_else(std::env::temp_dir)
        })
    }
}

/// Demo backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Host to bind to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Number of generated log records
    pub log_count: usize,
    /// Number of generated query records
    pub query_count: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5002,
            log_count: 2_000,
            query_count: 400,
        }
    }
}
