//! Tracing subscriber bootstrap.

use anyhow::Context;
use library_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter. Calling this again after a subscriber is installed
/// leaves the first one in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = build_filter(settings)?;

    let installed = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::info!(
                target: "library-telemetry",
                format = ?settings.log_format,
                "telemetry initialized"
            );
        }
        Err(_) => {
            tracing::debug!(target: "library-telemetry", "subscriber already installed");
        }
    }

    Ok(())
}

/// Resolve the filter from `RUST_LOG`, falling back to the configured directive.
pub fn build_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {} directive '{}'", EnvFilter::DEFAULT_ENV, directives)),
        _ => EnvFilter::try_new(&settings.filter)
            .with_context(|| format!("invalid telemetry filter '{}'", settings.filter)),
    }
}
