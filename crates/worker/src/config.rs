//! Worker configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use shiftwatch_events::config::{self, ConfigError};
use shiftwatch_events::{CsrConfig, NotifyConfig};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

const DEFAULT_FEED_MONTHS: u32 = shiftwatch_events::feed::DEFAULT_MONTHS;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::Invalid {
                name: "LOG_FORMAT",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub csr: CsrConfig,
    pub notify: NotifyConfig,
    pub poll_interval: Duration,
    pub feed_months: u32,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `DATABASE_URL`             | —       |
    /// | `DATABASE_MAX_CONNECTIONS` | `10`    |
    /// | `POLL_INTERVAL_SECS`       | `600`   |
    /// | `FEED_DEFAULT_MONTHS`      | `3`     |
    /// | `LOG_FORMAT`               | `text`  |
    ///
    /// Source and provider settings are read by [`CsrConfig::from_env`] and
    /// [`NotifyConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: config::required("DATABASE_URL")?,
            max_connections: config::parsed_or(
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            csr: CsrConfig::from_env()?,
            notify: NotifyConfig::from_env()?,
            poll_interval: Duration::from_secs(config::parsed_or(
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            feed_months: config::parsed_or("FEED_DEFAULT_MONTHS", DEFAULT_FEED_MONTHS)?,
            log_format: log_format_from_env()?,
        })
    }
}

/// Read only `LOG_FORMAT`, so logging can be set up before the rest of the
/// configuration is validated.
pub fn log_format_from_env() -> Result<LogFormat, ConfigError> {
    config::parsed_or("LOG_FORMAT", LogFormat::Text)
}
