//! Tracing setup for binaries, tests and benches that embed an emitter.
//!
//! The emitter crates only emit `tracing` events; nothing is printed until a
//! subscriber is installed, e.g. via [`init`].

/// Initialize process-wide tracing output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, formatting).
pub mod tracing;
