use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use vigil_core::config::LogConfig;

/// # Summary
/// Installs the global subscriber: stdout plus a daily-rolling file.
///
/// # Logic
/// 1. `RUST_LOG` wins over the configured filter.
/// 2. File output goes through a non-blocking writer.
///
/// # Returns
/// The writer guard; dropping it flushes and stops file logging.
pub fn init(config: &LogConfig) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.dir, "vigil.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()?;
    Ok(guard)
}
