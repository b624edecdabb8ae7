//! Tracing setup for slugline hosts.
//!
//! # Usage
//!
//! ```ignore
//! use slugline_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("slugline-editor"));
//! tracing::info!("editor started");
//! ```

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling (e.g., "slugline-editor")
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Load config from environment variables.
    ///
    /// - `RUST_LOG`: Standard env filter (optional, overrides console_level)
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Only the first call installs anything; later calls are no-ops so that
/// tests and embedding hosts can call it freely.
pub fn init(config: TelemetryConfig) {
    INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_filter(env_filter);

        // Another subscriber may already be installed by the host.
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!(service = %config.service_name, "telemetry initialized");
        }
    });
}

/// Install a test-friendly subscriber writing through the test harness.
pub fn init_for_tests() {
    INITIALIZED.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_for_tests();
        init(TelemetryConfig::from_env("slugline-test"));
        assert!(is_initialized());
    }
}
