use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;

/// Directory for daily log files. Unset means log to stderr.
pub const LOG_DIR_ENV: &str = "TRAITWATCH_LOG_DIR";

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the program so buffered file output gets flushed.
pub fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(dir) = std::env::var(LOG_DIR_ENV) {
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, "traitwatch.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer)
                    .init();
                return Some(guard);
            }
            Err(e) => eprintln!("cannot create log dir {dir}: {e}"),
        }
    }

    // Fallback to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    None
}
