//! Registration error model.

use thiserror::Error;

/// Result type returned by the fallible registration API.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Why a handler was not added to the registry.
///
/// The boolean registration API collapses every variant to `false`; the
/// `try_*` variants hand this back so callers can tell the cases apart.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The event type key was empty or whitespace only.
    #[error("invalid event type: {0:?}")]
    InvalidEventType(String),

    /// The same handler is already registered for this event type.
    #[error("handler already registered for event type {event_type:?}")]
    DuplicateHandler { event_type: String },
}

impl RegistrationError {
    pub fn invalid_event_type(raw: impl Into<String>) -> Self {
        Self::InvalidEventType(raw.into())
    }

    pub fn duplicate(event_type: impl Into<String>) -> Self {
        Self::DuplicateHandler {
            event_type: event_type.into(),
        }
    }
}
