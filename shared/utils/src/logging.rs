use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true);

            match open_log_file(config)? {
                Some(file) => registry.with(fmt_layer.with_writer(Mutex::new(file))).init(),
                None => registry.with(fmt_layer).init(),
            }
        }
        _ => {
            let fmt_layer = fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false);

            match open_log_file(config)? {
                Some(file) => registry
                    .with(fmt_layer.with_ansi(false).with_writer(Mutex::new(file)))
                    .init(),
                None => registry.with(fmt_layer).init(),
            }
        }
    }

    tracing::info!(level = %config.level, format = %config.format, "Logging initialized");
    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<Option<std::fs::File>> {
    let Some(file_path) = &config.file_path else {
        return Ok(None);
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .with_context(|| format!("Failed to open log file {}", file_path))?;
    Ok(Some(file))
}

#[macro_export]
macro_rules! log_error {
    ($err:expr, $msg:expr) => {
        tracing::error!(error = %$err, $msg);
    };
    ($err:expr, $msg:expr, $($field:tt)*) => {
        tracing::error!(error = %$err, $($field)*, $msg);
    };
}

#[macro_export]
macro_rules! log_warn {
    ($msg:expr) => {
        tracing::warn!($msg);
    };
    ($msg:expr, $($field:tt)*) => {
        tracing::warn!($($field)*, $msg);
    };
}

#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        tracing::info!($msg);
    };
    ($msg:expr, $($field:tt)*) => {
        tracing::info!($($field)*, $msg);
    };
}
