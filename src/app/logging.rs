//! Usage: Tracing subscriber setup (stderr + optional daily-rolling file) and panic logging.

use crate::infra::settings::{RelaySettings, DEFAULT_LOG_FILTER};
use crate::shared::error::{AppError, AppResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "cms-oauth-relay.log";

/// Keeps the file writer flushing; drop it only at process exit.
pub(crate) struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

fn build_filter(raw: &str) -> (EnvFilter, bool) {
    match EnvFilter::try_new(raw.trim()) {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_LOG_FILTER), false),
    }
}

pub(crate) fn init(settings: &RelaySettings) -> AppResult<LoggingGuard> {
    let (filter, filter_ok) = build_filter(&settings.log_filter);

    let (file_layer, file_guard) = match settings.log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                AppError::with_source(
                    "SYSTEM_ERROR",
                    format!("failed to create log dir {}: {e}", dir.display()),
                    e,
                )
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| format!("SYSTEM_ERROR: logging init failed: {e}"))?;

    if !filter_ok {
        tracing::warn!(
            filter = %settings.log_filter,
            fallback = DEFAULT_LOG_FILTER,
            "invalid log filter, using fallback"
        );
    }

    // Payload is not logged; it may contain request data.
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(location = %location, "PANIC: relay panicked at {location}");
    }));

    Ok(LoggingGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_filter_is_kept() {
        let (_, ok) = build_filter("cms_oauth_relay=debug,tower_http=warn");
        assert!(ok);
    }

    #[test]
    fn invalid_filter_falls_back() {
        let (_, ok) = build_filter("cms_oauth_relay=verbose");
        assert!(!ok);
    }
}
