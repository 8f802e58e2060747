//! Logging initialization for the server binary
//!
//! Supports JSON or human-readable console output, optional daily-rotated
//! file logging, and `RUST_LOG` overrides of the configured filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Guard for the non-blocking file writer; keep alive for the program
/// duration so buffered log lines are flushed on shutdown.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let file_guard = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            if config.json {
                let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
                registry
                    .with(fmt::layer().json())
                    .with(file_layer)
                    .try_init()?;
            } else {
                let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
                registry.with(fmt::layer()).with(file_layer).try_init()?;
            }
            Some(guard)
        }
        None => {
            if config.json {
                registry.with(fmt::layer().json()).try_init()?;
            } else {
                registry.with(fmt::layer()).try_init()?;
            }
            None
        }
    };

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
