//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

/// Initialize logging with a time-only format.
///
/// Respects `RUST_LOG`, falls back to `debug` when `verbose` is set, `info` otherwise.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();
}
