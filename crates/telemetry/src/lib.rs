//! Logging bootstrap.

use initdb_kernel::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. Logs go to stderr, filtered by `RUST_LOG`.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {}", err))?;

    tracing::debug!(
        target: "initdb-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );

    Ok(())
}
