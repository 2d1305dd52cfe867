//! The emitter: registration, removal and synchronous dispatch.
//!
//! ## Dispatch
//!
//! `fire` copies the handler sequence for its type under the lock, releases
//! the lock, then invokes the copied handlers in registration order. Handlers
//! may therefore call back into the emitter: anything they register is picked
//! up by the *next* `fire`, and a persistent handler they unregister still
//! runs in the current pass if it was part of the copy. One-shot entries are
//! the exception: each is claimed under the lock right before it runs, so a
//! one-shot entry that is gone by then is skipped.
//!
//! ## Errors
//!
//! Validation failures are silent (`false` / no-op); use the `try_*`
//! registration methods to learn why a registration was refused. A handler
//! that panics unwinds straight through `fire` and the remaining handlers of
//! that pass are skipped. The registry stays usable afterwards. A one-shot
//! handler is consumed before it runs, so one that panics is still gone.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use emitkit_core::{EventType, RegistrationError, RegistrationResult};

use crate::config::{EmitterConfig, OnceSemantics};
use crate::event::Event;
use crate::handler::Handler;
use crate::registry::Registry;

/// In-process publish/subscribe emitter.
///
/// - No IO / no async
/// - Handlers run on the calling thread, in registration order
/// - Safe to share across threads (`Arc<Emitter<D>>`)
pub struct Emitter<D = JsonValue> {
    config: EmitterConfig,
    registry: Mutex<Registry<D>>,
}

impl<D> Default for Emitter<D> {
    fn default() -> Self {
        Self::with_config(EmitterConfig::default())
    }
}

impl<D> core::fmt::Debug for Emitter<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Emitter")
            .field("config", &self.config)
            .field("event_types", &self.registry().event_types())
            .finish()
    }
}

impl<D> Emitter<D> {
    /// Create an emitter with an empty registry and default config.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self {
            config,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    // User code never runs under this lock, so a poisoned guard still holds
    // a consistent registry.
    fn registry(&self) -> MutexGuard<'_, Registry<D>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------------

    /// Register `handler` for `event_type`.
    ///
    /// Returns `false` without touching the registry if the type is blank or
    /// the handler is already registered for it.
    pub fn register(&self, event_type: &str, handler: &Handler<D>) -> bool {
        self.try_register(event_type, handler).is_ok()
    }

    /// Register `handler` to run on the next `fire` of `event_type` only.
    pub fn register_once(&self, event_type: &str, handler: &Handler<D>) -> bool {
        self.try_register_once(event_type, handler).is_ok()
    }

    /// Like [`register`](Self::register), reporting why a registration was refused.
    pub fn try_register(&self, event_type: &str, handler: &Handler<D>) -> RegistrationResult<()> {
        self.insert(event_type, handler, false)
    }

    pub fn try_register_once(
        &self,
        event_type: &str,
        handler: &Handler<D>,
    ) -> RegistrationResult<()> {
        self.insert(event_type, handler, true)
    }

    fn insert(
        &self,
        event_type: &str,
        handler: &Handler<D>,
        one_shot: bool,
    ) -> RegistrationResult<()> {
        if !EventType::is_valid(event_type) {
            trace!(emitter = %self.config.name, event_type, "rejected blank event type");
            return Err(RegistrationError::invalid_event_type(event_type));
        }

        match self.registry().insert(event_type, handler, one_shot) {
            Ok(()) => {
                debug!(emitter = %self.config.name, event_type, one_shot, "handler registered");
                Ok(())
            }
            Err(e) => {
                debug!(emitter = %self.config.name, event_type, "duplicate handler rejected");
                Err(e)
            }
        }
    }

    /// Alias of [`register`](Self::register).
    pub fn on(&self, event_type: &str, handler: &Handler<D>) -> bool {
        self.register(event_type, handler)
    }

    /// Alias of [`register_once`](Self::register_once).
    pub fn once(&self, event_type: &str, handler: &Handler<D>) -> bool {
        self.register_once(event_type, handler)
    }

    // ---------------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------------

    /// Remove handlers, depending on which arguments are given:
    ///
    /// - neither: drop every type and every handler
    /// - type only: empty that type's handlers (other types are untouched)
    /// - both: remove that one handler from that type
    ///
    /// A handler without a type is ignored, as is a blank type.
    pub fn unregister(&self, event_type: Option<&str>, handler: Option<&Handler<D>>) {
        match (event_type, handler) {
            (None, None) => self.unregister_all(),
            (Some(event_type), None) => self.unregister_type(event_type),
            (Some(event_type), Some(handler)) => {
                self.unregister_handler(event_type, handler);
            }
            (None, Some(_)) => {
                trace!(emitter = %self.config.name, "unregister without event type ignored");
            }
        }
    }

    /// Alias of [`unregister`](Self::unregister).
    pub fn off(&self, event_type: Option<&str>, handler: Option<&Handler<D>>) {
        self.unregister(event_type, handler)
    }

    /// Alias of [`unregister`](Self::unregister).
    pub fn remove_listener(&self, event_type: Option<&str>, handler: Option<&Handler<D>>) {
        self.unregister(event_type, handler)
    }

    pub fn unregister_all(&self) {
        self.registry().clear();
        debug!(emitter = %self.config.name, "all handlers removed");
    }

    pub fn unregister_type(&self, event_type: &str) {
        if !EventType::is_valid(event_type) {
            return;
        }
        let removed = self.registry().clear_type(event_type);
        debug!(emitter = %self.config.name, event_type, removed, "handlers removed for type");
    }

    /// Remove the first registration of `handler` for `event_type`.
    ///
    /// Returns whether anything was removed.
    pub fn unregister_handler(&self, event_type: &str, handler: &Handler<D>) -> bool {
        if !EventType::is_valid(event_type) {
            return false;
        }
        let removed = self.registry().remove(event_type, handler);
        if removed {
            debug!(emitter = %self.config.name, event_type, "handler removed");
        }
        removed
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Invoke every handler registered for `event_type` with one new event.
    ///
    /// No-op for a blank type or a type with no handlers. A one-shot entry is
    /// taken out of the registry before its handler runs; if another `fire`
    /// (or an `off`) got to it first, it is skipped. That way each one-shot
    /// registration runs at most once even when several threads fire the
    /// same type.
    pub fn fire(&self, event_type: &str, data: Option<D>) {
        if !EventType::is_valid(event_type) {
            trace!(emitter = %self.config.name, event_type, "fire with blank event type ignored");
            return;
        }

        let entries = self.registry().snapshot(event_type);
        if entries.is_empty() {
            trace!(emitter = %self.config.name, event_type, "no handlers");
            return;
        }

        debug!(
            emitter = %self.config.name,
            event_type,
            handlers = entries.len(),
            "dispatching event"
        );

        let mut event = Event::new(event_type, data);
        let mut invoked = 0usize;
        for entry in &entries {
            if entry.one_shot {
                if !self.registry().remove_entry(event_type, entry.id) {
                    trace!(
                        emitter = %self.config.name,
                        event_type,
                        "one-shot handler already consumed"
                    );
                    continue;
                }
                debug!(emitter = %self.config.name, event_type, "one-shot handler removed");
            }

            match self.config.once_semantics {
                OnceSemantics::PerHandler => event.set_once(entry.one_shot),
                OnceSemantics::SharedRecord => {
                    if entry.one_shot {
                        event.set_once(true);
                    }
                }
            }

            entry.handler.call(&event);
            invoked += 1;

            // Legacy sticky flag: persistent handlers seen after a one-shot
            // one are dropped too, but only this exact registration.
            if event.once()
                && !entry.one_shot
                && self.registry().remove_entry(event_type, entry.id)
            {
                debug!(
                    emitter = %self.config.name,
                    event_type,
                    "handler removed by shared once flag"
                );
            }
        }

        trace!(emitter = %self.config.name, event_type, invoked, "dispatch finished");
    }

    /// Fire `event_type` carrying `data`.
    pub fn emit(&self, event_type: &str, data: D) {
        self.fire(event_type, Some(data))
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.registry().len(event_type)
    }

    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.listener_count(event_type) > 0
    }

    pub fn is_registered(&self, event_type: &str, handler: &Handler<D>) -> bool {
        self.registry().contains(event_type, handler)
    }

    /// Every type key currently present, sorted. Includes types emptied by
    /// [`unregister_type`](Self::unregister_type).
    pub fn event_types(&self) -> Vec<String> {
        self.registry().event_types()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    /// Records `(label, once)` for every invocation.
    fn recording(log: &Arc<Mutex<Vec<(String, bool)>>>, label: &str) -> Handler {
        let log = Arc::clone(log);
        let label = label.to_string();
        Handler::new(move |ev: &Event| {
            log.lock().unwrap().push((label.clone(), ev.once()));
        })
    }

    fn labels(log: &Arc<Mutex<Vec<(String, bool)>>>) -> Vec<String> {
        log.lock().unwrap().iter().map(|(l, _)| l.clone()).collect()
    }

    #[test]
    fn register_twice_returns_true_then_false() {
        let emitter: Emitter = Emitter::new();
        let h = Handler::new(|_: &Event| {});

        assert!(emitter.register("t", &h));
        assert!(!emitter.register("t", &h));
        assert_eq!(emitter.listener_count("t"), 1);
    }

    #[test]
    fn blank_type_is_rejected_without_mutation() {
        let emitter: Emitter = Emitter::new();
        let h = Handler::new(|_: &Event| {});

        assert!(!emitter.register("", &h));
        assert!(!emitter.register_once("   ", &h));
        assert_eq!(
            emitter.try_register("", &h),
            Err(RegistrationError::InvalidEventType(String::new()))
        );
        assert!(emitter.event_types().is_empty());
    }

    #[test]
    fn try_register_reports_duplicates() {
        let emitter: Emitter = Emitter::new();
        let h = Handler::new(|_: &Event| {});

        emitter.try_register("t", &h).unwrap();
        assert_eq!(
            emitter.try_register_once("t", &h),
            Err(RegistrationError::duplicate("t"))
        );
    }

    #[test]
    fn duplicate_once_does_not_turn_existing_registration_one_shot() {
        let emitter: Emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = recording(&log, "h");

        assert!(emitter.on("t", &h));
        assert!(!emitter.once("t", &h));

        emitter.fire("t", None);
        emitter.fire("t", None);
        assert_eq!(labels(&log), vec!["h", "h"]);
        assert!(emitter.is_registered("t", &h));
    }

    #[test]
    fn fire_runs_handlers_in_registration_order() {
        let emitter: Emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (h1, h2, h3) = (recording(&log, "h1"), recording(&log, "h2"), recording(&log, "h3"));

        emitter.register("t", &h1);
        emitter.register("t", &h2);
        emitter.register("t", &h3);
        emitter.fire("t", None);

        assert_eq!(labels(&log), vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn fire_passes_payload_and_metadata() {
        let emitter: Emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let h = Handler::new(move |ev: &Event| {
            *sink.lock().unwrap() = Some(ev.clone());
        });

        emitter.on("greet", &h);
        let before = chrono::Utc::now().timestamp_millis();
        emitter.fire("greet", Some(json!({ "name": "a" })));
        let after = chrono::Utc::now().timestamp_millis();

        let ev = seen.lock().unwrap().take().unwrap();
        assert_eq!(ev.event_type(), "greet");
        assert_eq!(ev.data().unwrap()["name"], "a");
        assert!(!ev.once());
        assert!(ev.timestamp() >= before && ev.timestamp() <= after);
    }

    #[test]
    fn fire_without_data_or_handlers_is_a_no_op() {
        let emitter: Emitter = Emitter::new();
        emitter.fire("nope", None);
        emitter.fire("", None);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let h = Handler::new(move |ev: &Event| sink.lock().unwrap().push(ev.data().cloned()));
        emitter.on("t", &h);
        emitter.fire("t", None);
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn once_handler_runs_a_single_time() {
        let emitter: Emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = recording(&log, "h");

        assert!(emitter.register_once("t", &h));
        emitter.fire("t", None);
        assert!(!emitter.is_registered("t", &h));
        emitter.fire("t", None);

        assert_eq!(*log.lock().unwrap(), vec![("h".to_string(), true)]);
    }

    #[test]
    fn per_handler_once_does_not_leak_to_later_handlers() {
        let emitter: Emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (recording(&log, "a"), recording(&log, "b"));

        emitter.once("t", &a);
        emitter.on("t", &b);
        emitter.fire("t", None);

        assert_eq!(
            *log.lock().unwrap(),
            vec![("a".to_string(), true), ("b".to_string(), false)]
        );
        assert!(!emitter.is_registered("t", &a));
        assert!(emitter.is_registered("t", &b));
    }

    #[test]
    fn shared_record_once_is_sticky_for_the_pass() {
        let config = EmitterConfig::default().with_once_semantics(OnceSemantics::SharedRecord);
        let emitter: Emitter = Emitter::with_config(config);
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c) = (recording(&log, "a"), recording(&log, "b"), recording(&log, "c"));

        emitter.on("t", &a);
        emitter.once("t", &b);
        emitter.on("t", &c);
        emitter.fire("t", None);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("a".to_string(), false),
                ("b".to_string(), true),
                ("c".to_string(), true),
            ]
        );
        // c saw once == true and is removed along with b.
        assert!(emitter.is_registered("t", &a));
        assert!(!emitter.is_registered("t", &b));
        assert!(!emitter.is_registered("t", &c));
    }

    #[test]
    fn one_shot_status_is_per_type() {
        let emitter: Emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let h = recording(&log, "h");

        emitter.once("a", &h);
        emitter.on("b", &h);

        emitter.fire("a", None);
        emitter.fire("b", None);
        emitter.fire("b", None);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("h".to_string(), true),
                ("h".to_string(), false),
                ("h".to_string(), false),
            ]
        );
        assert!(!emitter.is_registered("a", &h));
        assert!(emitter.is_registered("b", &h));
    }

    #[test]
    fn unregister_with_both_arguments_removes_one_handler() {
        let emitter: Emitter = Emitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (h1, h2) = (recording(&log, "h1"), recording(&log, "h2"));

        emitter.on("t", &h1);
        emitter.on("t", &h2);
        emitter.unregister(Some("t"), Some(&h1));
        emitter.fire("t", None);

        assert_eq!(labels(&log), vec!["h2"]);
        assert_eq!(emitter.listener_count("t"), 1);
    }

    #[test]
    fn unregister_ignores_unknown_or_invalid_targets() {
        let emitter: Emitter = Emitter::new();
        let h = Handler::new(|_: &Event| {});
        let other = Handler::new(|_: &Event| {});
        emitter.on("t", &h);

        emitter.off(Some("missing"), Some(&h));
        emitter.off(Some("t"), Some(&other));
        emitter.off(Some(""), Some(&h));
        emitter.off(None, Some(&h));

        assert!(emitter.is_registered("t", &h));
    }

    #[test]
    fn unregister_type_only_touches_that_type() {
        let emitter: Emitter = Emitter::new();
        let h = Handler::new(|_: &Event| {});
        emitter.on("a", &h);
        emitter.on("b", &h);

        emitter.remove_listener(Some("a"), None);

        assert_eq!(emitter.listener_count("a"), 0);
        assert_eq!(emitter.listener_count("b"), 1);
        assert_eq!(emitter.event_types(), vec!["a", "b"]);
    }

    #[test]
    fn unregister_without_arguments_resets_everything() {
        let emitter: Emitter = Emitter::new();
        let h = Handler::new(|_: &Event| {});
        emitter.on("a", &h);
        emitter.once("b", &h);

        emitter.unregister(None, None);

        assert!(!emitter.has_listeners("a"));
        assert!(!emitter.has_listeners("b"));
        assert!(emitter.event_types().is_empty());
        assert!(emitter.on("a", &h));
    }

    #[test]
    fn one_shot_removal_spares_a_re_registration_made_mid_pass() {
        let emitter: Arc<Emitter> = Arc::new(Emitter::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let target = recording(&log, "target");

        let weak = Arc::downgrade(&emitter);
        let swap_target = target.clone();
        let swapper = Handler::new(move |_: &Event| {
            if let Some(emitter) = weak.upgrade() {
                emitter.off(Some("t"), Some(&swap_target));
                emitter.on("t", &swap_target);
            }
        });

        emitter.on("t", &swapper);
        emitter.once("t", &target);
        emitter.fire("t", None);

        // The one-shot entry was swapped out before its turn; the persistent
        // replacement survives and runs from the next fire on.
        assert!(log.lock().unwrap().is_empty());
        assert!(emitter.is_registered("t", &target));

        emitter.fire("t", None);
        assert_eq!(*log.lock().unwrap(), vec![("target".to_string(), false)]);
        assert!(emitter.is_registered("t", &target));
    }

    #[test]
    fn shared_record_removal_spares_a_re_registration_made_mid_pass() {
        let config = EmitterConfig::default().with_once_semantics(OnceSemantics::SharedRecord);
        let emitter: Arc<Emitter> = Arc::new(Emitter::with_config(config));
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = recording(&log, "first");
        let later = recording(&log, "later");

        let weak = Arc::downgrade(&emitter);
        let swap_later = later.clone();
        let swapper = Handler::new(move |_: &Event| {
            if let Some(emitter) = weak.upgrade() {
                emitter.off(Some("t"), Some(&swap_later));
                emitter.on("t", &swap_later);
            }
        });

        emitter.once("t", &first);
        emitter.on("t", &swapper);
        emitter.on("t", &later);
        emitter.fire("t", None);

        // `later` ran with the sticky flag set, but its original entry was
        // already replaced, so the fresh registration stays.
        assert!(emitter.is_registered("t", &later));
        assert!(!emitter.is_registered("t", &swapper));
    }
}
