use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::CollectorConfig;

const LOG_FILE_PREFIX: &str = "prometheus-collector.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level`. When `log_dir` is set, output goes to a daily
/// rolling file and the returned guard must be kept alive for the process lifetime.
pub fn init_tracing(config: &CollectorConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .try_init();
            None
        }
    }
}
