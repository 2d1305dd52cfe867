//! `emitkit-core` — validated building blocks shared by the emitter crates.
//!
//! This crate has no dispatch logic; it only defines the event-type key and
//! the error taxonomy used when a registration is refused.

pub mod error;
pub mod event_type;

pub use error::{RegistrationError, RegistrationResult};
pub use event_type::EventType;
