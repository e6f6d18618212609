//! Tracing bootstrap shared by the server and the CLI.

use anyhow::anyhow;
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter from `RUST_LOG`, falling back to the configured default.
pub fn env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.default_filter))
}

/// Install the global tracing subscriber. Logs go to stderr.
///
/// Fails if a subscriber is already installed for this process.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(settings));

    let installed = match settings.log_format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    tracing::debug!(
        target: "shelf-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

/// Like [`init`], but treats an already-installed subscriber as success.
/// Used by short-lived commands and tests that may initialize twice.
pub fn try_init(settings: &TelemetrySettings) {
    if let Err(err) = init(settings) {
        tracing::trace!(error = %err, "tracing already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_used_without_rust_log() {
        let settings = TelemetrySettings {
            log_format: LogFormat::Json,
            default_filter: "warn".to_string(),
        };
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(env_filter(&settings).to_string(), "warn");
        }
    }

    #[test]
    fn second_init_is_reported() {
        let settings = TelemetrySettings::default();
        try_init(&settings);
        assert!(init(&settings).is_err());
    }
}
