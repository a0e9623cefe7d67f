// ── Push rules ──
//
// How a cache reacts to bus events: take the payload as the new value, or
// treat the event as a hint and re-pull.

use std::sync::{Arc, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Freshness, ResourceCache};
use crate::bus::EventBus;

/// Reaction of one cache to one event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushRule {
    /// Decode the payload (or the JSON pointer inside it) and replace the
    /// value. Missing or `null` targets leave the cache untouched.
    Replace {
        event_type: String,
        pointer: Option<String>,
    },
    /// Ignore the payload and trigger `refresh_now`.
    Invalidate { event_type: String },
}

impl PushRule {
    pub fn replace(event_type: impl Into<String>) -> Self {
        Self::Replace {
            event_type: event_type.into(),
            pointer: None,
        }
    }

    /// Replace from a field of the payload, e.g. `/dashboard`.
    pub fn replace_at(event_type: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::Replace {
            event_type: event_type.into(),
            pointer: Some(pointer.into()),
        }
    }

    pub fn invalidate(event_type: impl Into<String>) -> Self {
        Self::Invalidate {
            event_type: event_type.into(),
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::Replace { event_type, .. } | Self::Invalidate { event_type } => event_type,
        }
    }
}

impl<T> ResourceCache<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Subscribe this cache to `bus` according to `rules`.
    ///
    /// Handlers hold only a weak reference, so binding does not keep the
    /// cache alive; once the cache is dropped its handlers do nothing.
    pub fn bind(&self, bus: &EventBus, rules: impl IntoIterator<Item = PushRule>) {
        let mut bindings = self.inner.bindings.lock().unwrap_or_else(PoisonError::into_inner);

        for rule in rules {
            let event_type = rule.event_type().to_owned();
            let weak = self.downgrade();

            let sub = match rule {
                PushRule::Replace { pointer, .. } => bus.subscribe_fn(event_type, move |data| {
                    if let Some(inner) = weak.upgrade() {
                        Self::from_inner(inner).apply_push(data, pointer.as_deref());
                    }
                }),
                PushRule::Invalidate { .. } => bus.subscribe_fn(event_type, move |_| {
                    if let Some(inner) = weak.upgrade() {
                        Self::from_inner(inner).spawn_refresh();
                    }
                }),
            };
            bindings.push(sub);
        }
    }

    /// Remove every subscription made by [`bind`](Self::bind).
    pub fn unbind(&self) {
        let mut bindings = self.inner.bindings.lock().unwrap_or_else(PoisonError::into_inner);
        for sub in bindings.drain(..) {
            sub.unsubscribe();
        }
    }

    fn apply_push(&self, data: &Value, pointer: Option<&str>) {
        let target = match pointer {
            Some(p) => data.pointer(p),
            None => Some(data),
        };
        let Some(target) = target.filter(|v| !v.is_null()) else {
            debug!(resource = %self.inner.name, ?pointer, "push carried no value");
            return;
        };

        match T::deserialize(target) {
            Ok(value) => self.apply(Arc::new(value), Freshness::Pushed),
            Err(e) => debug!(resource = %self.inner.name, error = %e, "dropping undecodable push"),
        }
    }

    fn spawn_refresh(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(resource = %self.inner.name, "invalidated outside a runtime; refresh skipped");
            return;
        };
        let cache = self.clone();
        runtime.spawn(async move {
            // failures are recorded in the cache state
            let _ = cache.refresh_now().await;
        });
    }
}
