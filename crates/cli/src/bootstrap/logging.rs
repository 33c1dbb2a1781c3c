use dot_proxy_domain::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_file(true)
            .with_line_number(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
