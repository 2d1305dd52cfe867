//! Subscriber initialization.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// Emitter logs are at `debug`/`trace`; `RUST_LOG=emitkit_events=debug`
/// shows registrations and dispatches.
pub fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a JSON fmt subscriber.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        ::tracing::debug!(default_filter = DEFAULT_FILTER, "tracing subscriber installed");
    }
}
