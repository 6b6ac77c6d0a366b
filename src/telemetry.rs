//! Tracing/logging initialization.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber writing to stdout through a background
/// worker. Keep the returned guard alive until shutdown so buffered lines
/// are flushed.
pub fn init(json: bool) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    // Repeated init (tests, tools) is a no-op.
    let _ = if json {
        builder.json().with_target(false).try_init()
    } else {
        builder.try_init()
    };

    guard
}
