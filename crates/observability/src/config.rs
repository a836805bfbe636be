//! Logging configuration read from the environment.

use core::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Filter directives; falls back to `RUST_LOG`, then `info`.
pub const LOG_ENV: &str = "NLAYER_LOG";
/// Output format: `json` (default), `pretty` or `compact`.
pub const LOG_FORMAT_ENV: &str = "NLAYER_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown log format '{0}' (expected json, pretty or compact)")]
    UnknownFormat(String),
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let filter = present(LOG_ENV)
            .or_else(|| present("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = present(LOG_FORMAT_ENV)
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self { filter, format })
    }
}
