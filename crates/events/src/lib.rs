//! `emitkit-events` — a small in-process publish/subscribe emitter.
//!
//! Callers register [`Handler`]s against string event types; [`Emitter::fire`]
//! synchronously invokes every handler registered for a type, in registration
//! order, passing a fresh [`Event`] record.
//!
//! ```
//! use emitkit_events::{Emitter, Event, Handler};
//! use serde_json::json;
//!
//! let emitter: Emitter = Emitter::new();
//! let greet = Handler::new(|ev: &Event| {
//!     assert_eq!(ev.event_type(), "greet");
//! });
//!
//! assert!(emitter.on("greet", &greet));
//! assert!(!emitter.on("greet", &greet)); // duplicates are rejected
//! emitter.fire("greet", Some(json!({ "name": "a" })));
//! ```

pub mod config;
pub mod emitter;
pub mod event;
pub mod handler;
mod registry;

pub use config::{EmitterConfig, OnceSemantics};
pub use emitter::Emitter;
pub use event::Event;
pub use handler::Handler;

pub use emitkit_core::{EventType, RegistrationError, RegistrationResult};
