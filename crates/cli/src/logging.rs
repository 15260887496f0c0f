use tireslingers_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber on stderr; stdout carries the JSON payload.
pub fn init(logging: &LoggingConfig) -> anyhow::Result<()> {
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_target(false).with_max_level(level).with_writer(std::io::stderr);

    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))
}
