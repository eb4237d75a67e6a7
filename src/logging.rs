//! # Structured Logging
//!
//! The library only emits `tracing` events; embedding applications decide where they go.
//! [`init_logging`] installs a `tracing-subscriber` registry for binaries and tests that want one.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ConfigError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Accepts "json" (case-insensitive); anything else is `Pretty`.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `default_level` when set.
///
/// Returns an error instead of panicking when a global subscriber is already installed.
pub fn init_logging(default_level: &str, format: LogFormat) -> Result<(), ConfigError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_file(true).with_line_number(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    };
    result.map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::info!("logging initialized (format={:?})", format);
    Ok(())
}
