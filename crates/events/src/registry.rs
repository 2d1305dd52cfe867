//! Per-type handler table.

use std::collections::HashMap;

use emitkit_core::{RegistrationError, RegistrationResult};

use crate::handler::Handler;

/// A registered handler plus its one-shot flag.
///
/// The flag lives here rather than on the handler so one handler can be
/// one-shot for one type and persistent for another. `id` is unique per
/// registration, so removing and re-adding a handler yields a new entry.
pub(crate) struct Entry<D> {
    pub(crate) id: u64,
    pub(crate) handler: Handler<D>,
    pub(crate) one_shot: bool,
}

impl<D> Clone for Entry<D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: self.handler.clone(),
            one_shot: self.one_shot,
        }
    }
}

/// Event type → handlers in registration order. Keys are exact strings.
pub(crate) struct Registry<D> {
    by_type: HashMap<String, Vec<Entry<D>>>,
    next_id: u64,
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self {
            by_type: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<D> Registry<D> {
    /// Append `handler` unless it is already present for `event_type`.
    pub(crate) fn insert(
        &mut self,
        event_type: &str,
        handler: &Handler<D>,
        one_shot: bool,
    ) -> RegistrationResult<()> {
        let entries = self.by_type.entry(event_type.to_owned()).or_default();
        if entries.iter().any(|e| e.handler.same_as(handler)) {
            return Err(RegistrationError::duplicate(event_type));
        }
        entries.push(Entry {
            id: self.next_id,
            handler: handler.clone(),
            one_shot,
        });
        self.next_id += 1;
        Ok(())
    }

    /// Remove the entry with registration `id`, if it is still present.
    ///
    /// Succeeds for exactly one caller per registration.
    pub(crate) fn remove_entry(&mut self, event_type: &str, id: u64) -> bool {
        let Some(entries) = self.by_type.get_mut(event_type) else {
            return false;
        };
        match entries.iter().position(|e| e.id == id) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove the first entry matching `handler`. Returns whether one was removed.
    pub(crate) fn remove(&mut self, event_type: &str, handler: &Handler<D>) -> bool {
        let Some(entries) = self.by_type.get_mut(event_type) else {
            return false;
        };
        match entries.iter().position(|e| e.handler.same_as(handler)) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Empty one type's sequence; the key stays present.
    pub(crate) fn clear_type(&mut self, event_type: &str) -> usize {
        let entries = self.by_type.entry(event_type.to_owned()).or_default();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.by_type = HashMap::new();
    }

    /// Copy of the sequence for `event_type` as it stands now.
    pub(crate) fn snapshot(&self, event_type: &str) -> Vec<Entry<D>> {
        self.by_type
            .get(event_type)
            .map(|entries| entries.to_vec())
            .unwrap_or_default()
    }

    pub(crate) fn len(&self, event_type: &str) -> usize {
        self.by_type.get(event_type).map_or(0, Vec::len)
    }

    pub(crate) fn contains(&self, event_type: &str, handler: &Handler<D>) -> bool {
        self.by_type
            .get(event_type)
            .is_some_and(|entries| entries.iter().any(|e| e.handler.same_as(handler)))
    }

    pub(crate) fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.by_type.keys().cloned().collect();
        types.sort();
        types
    }
}
