// ── Event bus ──
//
// Untyped in-process publish/subscribe keyed by event type. Dispatch is
// synchronous on the caller's task; every handler for a dispatch sees the
// same payload reference. Payload validation belongs to subscribers.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;
use tracing::{trace, warn};

/// A bus callback. Identity is the `Arc` allocation: registering the same
/// `Handler` twice for one event type is a no-op.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Cheaply cloneable event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    handlers: DashMap<String, Vec<Arc<Registration>>>,
    next_id: AtomicU64,
}

struct Registration {
    id: u64,
    handler: Handler,
    active: AtomicBool,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.inner.handlers.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`.
    ///
    /// Returns the handle used to unsubscribe. Dropping the handle leaves
    /// the handler registered.
    pub fn subscribe(&self, event_type: impl Into<String>, handler: Handler) -> Subscription {
        let event_type = event_type.into();
        let mut entry = self.inner.handlers.entry(event_type.clone()).or_default();

        let registration = if let Some(existing) = entry.iter().find(|r| Arc::ptr_eq(&r.handler, &handler)) {
            Arc::clone(existing)
        } else {
            let registration = Arc::new(Registration {
                id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
                handler,
                active: AtomicBool::new(true),
            });
            entry.push(Arc::clone(&registration));
            registration
        };
        drop(entry);

        Subscription {
            bus: Arc::downgrade(&self.inner),
            event_type,
            registration,
        }
    }

    /// Convenience for closures that are never registered twice.
    pub fn subscribe_fn<F>(&self, event_type: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(event_type, Arc::new(handler))
    }

    /// Invoke every handler currently registered for `event_type`.
    ///
    /// A panicking handler is logged and skipped; the rest still run.
    /// Handlers registered during this dispatch are not invoked for it;
    /// handlers unsubscribed during it are not invoked if not yet reached.
    /// Returns the number of handlers that completed.
    pub fn dispatch(&self, event_type: &str, payload: &Value) -> usize {
        let Some(snapshot) = self.inner.handlers.get(event_type).map(|e| e.value().clone()) else {
            trace!(event_type, "no subscribers");
            return 0;
        };

        let mut delivered = 0;
        for registration in snapshot {
            if !registration.active.load(Ordering::Acquire) {
                continue;
            }
            let handler = &registration.handler;
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(event_type, handler = registration.id, "event handler panicked"),
            }
        }
        delivered
    }

    /// Number of handlers registered for `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.inner.handlers.get(event_type).map_or(0, |e| e.len())
    }
}

// ── Subscription handle ──────────────────────────────────────────

/// Handle returned by [`EventBus::subscribe`].
pub struct Subscription {
    bus: Weak<BusInner>,
    event_type: String,
    registration: Arc<Registration>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event_type", &self.event_type)
            .field("id", &self.registration.id)
            .finish()
    }
}

impl Subscription {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Remove exactly this handler. Takes effect immediately, including
    /// for a dispatch that is currently running.
    pub fn unsubscribe(&self) {
        self.registration.active.store(false, Ordering::Release);

        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        if let Some(mut entry) = bus.handlers.get_mut(&self.event_type) {
            entry.retain(|r| r.id != self.registration.id);
        }
        bus.handlers.remove_if(&self.event_type, |_, handlers| handlers.is_empty());
    }
}
