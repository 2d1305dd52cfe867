use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::event::Event;

type Callback<D> = dyn Fn(&Event<D>) + Send + Sync;

/// A caller-supplied callback.
///
/// Handlers are compared by identity, not by behaviour: clones of one
/// `Handler` are the same handler, while two handlers built from identical
/// closures are distinct. Keep a clone around to unregister it later.
pub struct Handler<D = JsonValue> {
    callback: Arc<Callback<D>>,
}

impl<D> Handler<D> {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&Event<D>) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Identity comparison.
    pub fn same_as(&self, other: &Handler<D>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.callback), Arc::as_ptr(&other.callback))
    }

    pub(crate) fn call(&self, event: &Event<D>) {
        (self.callback)(event)
    }
}

impl<D> Clone for Handler<D> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<D> PartialEq for Handler<D> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<D> Eq for Handler<D> {}

impl<D> core::fmt::Debug for Handler<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handler")
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}
