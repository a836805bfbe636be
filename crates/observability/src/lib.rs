//! Tracing and logging setup shared by hosts and tests.

pub mod config;
pub mod tracing;

pub use config::{ConfigError, LogFormat, ObservabilityConfig};
pub use crate::tracing::init_with;

/// Initialize process-wide logging from `NLAYER_LOG` / `NLAYER_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops. An invalid
/// configuration falls back to the defaults and is reported once logging is up.
pub fn init() {
    match ObservabilityConfig::from_env() {
        Ok(config) => tracing::init_with(&config),
        Err(err) => {
            tracing::init_with(&ObservabilityConfig::default());
            ::tracing::warn!(error = %err, "invalid logging configuration; using defaults");
        }
    }
}
