//! Structured logging setup
//!
//! Events go to stderr so the statistics report on stdout stays clean. The
//! filter comes from `RUST_LOG` and defaults to `info`.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Default filter when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the global tracing subscriber once
///
/// # Arguments
///
/// * `json` - emit one JSON object per event instead of human-readable lines
pub fn init_logging(json: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let builder = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr);

        // try_init: a subscriber installed by a test harness is not an error
        let installed = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        if installed.is_err() {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(false);
        init_logging(true);
        assert!(LOGGER_INITIALIZED.get().is_some());
    }
}
