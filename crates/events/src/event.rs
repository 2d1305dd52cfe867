use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Highest timestamp handed out so far in this process.
static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Milliseconds since the Unix epoch, never smaller than a previous result.
fn monotonic_millis() -> i64 {
    let now = Utc::now().timestamp_millis();
    let prev = LAST_TIMESTAMP_MS.fetch_max(now, Ordering::AcqRel);
    prev.max(now)
}

/// The record passed to handlers when an event type fires.
///
/// One record is created per [`fire`](crate::Emitter::fire) call. `event_type`,
/// `data` and `timestamp` are fixed at creation; only the emitter touches
/// `once`, right before each handler invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event<D = JsonValue> {
    #[serde(rename = "type")]
    event_type: String,
    data: Option<D>,
    /// Creation instant in epoch milliseconds (monotonic per process).
    timestamp: i64,
    once: bool,
}

impl<D> Event<D> {
    pub(crate) fn new(event_type: impl Into<String>, data: Option<D>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: monotonic_millis(),
            once: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Payload supplied to `fire`, if any.
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// `true` when the current invocation is a one-shot handler's.
    ///
    /// Under [`OnceSemantics::SharedRecord`](crate::OnceSemantics::SharedRecord)
    /// this stays `true` for the rest of the pass once set.
    pub fn once(&self) -> bool {
        self.once
    }

    pub(crate) fn set_once(&mut self, once: bool) {
        self.once = once;
    }

    pub fn into_data(self) -> Option<D> {
        self.data
    }
}
