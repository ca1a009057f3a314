//! One-to-many event dispatch for Shoal.
//!
//! Both the protocol wrapper and the chat connector notify interested
//! parties through a [`Dispatcher`]: an ordered list of listeners plus an
//! allow-list of event names. Listeners are trait objects with default
//! no-op methods, so each listener only overrides the events it cares
//! about.
//!
//! Delivery is isolated: a panicking listener is logged and skipped, and
//! every remaining listener still receives the event.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// An ordered registry of listeners for one event family.
///
/// The type parameter is usually a trait object (`dyn LinkListener`,
/// `dyn ChatListener`). The dispatcher itself knows nothing about the
/// events — callers pass a closure that invokes the right trait method
/// on each listener.
pub struct Dispatcher<L: ?Sized + Send + Sync> {
    /// Event names this dispatcher will deliver. Anything else is a no-op.
    allowed: &'static [&'static str],
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized + Send + Sync> Dispatcher<L> {
    /// Creates an empty dispatcher that delivers only the named events.
    pub fn new(allowed: &'static [&'static str]) -> Self {
        Self {
            allowed,
            listeners: Vec::new(),
        }
    }

    /// Appends a listener. Listeners are invoked in registration order.
    pub fn register(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Appends several listeners at once, preserving their order.
    pub fn register_all(&mut self, listeners: impl IntoIterator<Item = Arc<L>>) {
        self.listeners.extend(listeners);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers an event to every listener.
    ///
    /// If `event` is not in the allow-list this is a no-op (trace-logged).
    /// A listener that panics is logged and skipped; delivery continues
    /// with the next listener. There is no retry.
    pub fn dispatch(&self, event: &str, invoke: impl Fn(&L)) {
        if !self.allowed.contains(&event) {
            tracing::trace!(event, "event not in allow-list, dropping");
            return;
        }
        for (idx, listener) in self.listeners.iter().enumerate() {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| invoke(listener)));
            if result.is_err() {
                tracing::error!(
                    event,
                    listener = idx,
                    "listener panicked during dispatch"
                );
            }
        }
    }
}

impl<L: ?Sized + Send + Sync> Default for Dispatcher<L> {
    fn default() -> Self {
        Self::new(&[])
    }
}
