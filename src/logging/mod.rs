pub mod config;

pub use config::LoggingConfig;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Инициализация логирования с конфигурацией.
///
/// `RUST_LOG` имеет приоритет над уровнем из конфигурации.
pub fn init_logging(mut config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.apply_env_overrides();

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.console_enabled {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(config.ansi))
            .try_init()?;
    } else {
        registry.try_init()?;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        "logging initialized"
    );

    Ok(())
}
