use {
    sluice_config::{LogConfig, LogFormat},
    tracing_subscriber::EnvFilter,
};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
