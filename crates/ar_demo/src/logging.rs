//! Logging system setup
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over the
//! configured level.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSettings;

/// Initialize the logging system with plain or JSON output.
///
/// Logs go to stderr so the raster and summary on stdout stay machine-readable.
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    if settings.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!(level = %settings.level, json = settings.json_format, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_setup_only_installs_once() {
        let settings = LoggingSettings::default();
        // The global subscriber can only be set once per process; whichever call comes
        // second must fail cleanly rather than panic.
        let _ = setup_logging(&settings);
        assert!(setup_logging(&settings).is_err());
    }
}
