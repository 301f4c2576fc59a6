use tracing_subscriber::EnvFilter;

use crate::schema::LoggingConfig;

/// Install the global tracing subscriber from the logging config.
///
/// `RUST_LOG` takes precedence over the configured level so operators can
/// override verbosity without touching `axon.toml`. Safe to call more than
/// once; later calls are no-ops (useful in tests where ordering is unknown).
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    // A second init attempt means a subscriber is already installed.
    let _ = result;
}
