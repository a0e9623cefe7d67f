// ── Resource caches ──
//
// One `ResourceCache` per logical resource (dashboard snapshot, coin list,
// blacklist). Holds the last known value and reconciles pulls (REST) with
// pushes (event bus). Writes are single-writer per cache; reads go through
// a `watch` channel so any number of consumers can observe snapshots.

mod polling;
mod rules;

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::bus::Subscription;
use crate::error::CoreError;

pub use rules::PushRule;

/// Pull function for a cache. Called once per refresh; calls are never
/// deduplicated.
pub type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, CoreError>> + Send + Sync>;

/// Where the current value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Freshness {
    Pulled,
    Pushed,
}

// ── ResourceState ────────────────────────────────────────────────

/// Point-in-time view of a cache.
///
/// The value survives failed pulls (stale-while-revalidate); `error` holds
/// the most recent pull failure until the next successful write.
#[derive(Debug)]
pub struct ResourceState<T> {
    pub value: Option<Arc<T>>,
    pub freshness: Option<Freshness>,
    /// Pulls currently in flight.
    pub pending: u32,
    pub error: Option<CoreError>,
    /// Time of the last successful write.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            value: None,
            freshness: None,
            pending: 0,
            error: None,
            updated_at: None,
        }
    }
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            freshness: self.freshness,
            pending: self.pending,
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

impl<T> ResourceState<T> {
    /// No value has been obtained yet.
    pub fn is_loading(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_refreshing(&self) -> bool {
        self.pending > 0
    }

    /// How old the value is at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.updated_at.map(|at| now - at)
    }
}

// ── ResourceCache ────────────────────────────────────────────────

/// Cache for one named resource. Cheaply cloneable.
pub struct ResourceCache<T> {
    inner: Arc<CacheInner<T>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for ResourceCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ResourceCache")
            .field("name", &self.inner.name)
            .field("loaded", &state.value.is_some())
            .field("freshness", &state.freshness)
            .field("pending", &state.pending)
            .finish_non_exhaustive()
    }
}

struct CacheInner<T> {
    name: String,
    loader: Loader<T>,
    state: watch::Sender<ResourceState<T>>,
    bindings: Mutex<Vec<Subscription>>,
}

impl<T> Drop for CacheInner<T> {
    fn drop(&mut self) {
        let bindings = self.bindings.get_mut().unwrap_or_else(PoisonError::into_inner);
        for sub in bindings.drain(..) {
            sub.unsubscribe();
        }
    }
}

impl<T: Send + Sync + 'static> ResourceCache<T> {
    /// Create an empty cache pulled through `loader`.
    pub fn new<F, Fut>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let loader: Loader<T> = Arc::new(move || loader().boxed());
        let (state, _) = watch::channel(ResourceState::default());
        Self {
            inner: Arc::new(CacheInner {
                name: name.into(),
                loader,
                state,
                bindings: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Current value, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.state.borrow().value.clone()
    }

    pub fn state(&self) -> ResourceState<T> {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ResourceState<T>> {
        self.inner.state.subscribe()
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Pull now and replace the value on success.
    ///
    /// On failure the previous value is kept and the error is recorded.
    /// Concurrent calls are independent; whichever resolves last wins.
    pub async fn refresh_now(&self) -> Result<Arc<T>, CoreError> {
        self.inner.state.send_modify(|s| s.pending += 1);

        let result = (self.inner.loader)().await.map(Arc::new);

        self.inner.state.send_modify(|s| {
            s.pending = s.pending.saturating_sub(1);
            match &result {
                Ok(value) => {
                    s.value = Some(Arc::clone(value));
                    s.freshness = Some(Freshness::Pulled);
                    s.error = None;
                    s.updated_at = Some(Utc::now());
                }
                Err(e) => s.error = Some(e.clone()),
            }
        });

        match &result {
            Ok(_) => debug!(resource = %self.inner.name, "pull applied"),
            Err(e) => warn!(resource = %self.inner.name, error = %e, "pull failed"),
        }
        result
    }

    /// Replace the value wholesale.
    pub fn replace(&self, value: T, freshness: Freshness) {
        self.apply(Arc::new(value), freshness);
    }

    fn apply(&self, value: Arc<T>, freshness: Freshness) {
        self.inner.state.send_modify(|s| {
            s.value = Some(value);
            s.freshness = Some(freshness);
            s.error = None;
            s.updated_at = Some(Utc::now());
        });
        debug!(resource = %self.inner.name, %freshness, "value replaced");
    }

    /// Run a backend mutation, then reconcile with a pull.
    ///
    /// The pull happens whether or not the request succeeded, and the
    /// request's response never touches the cached value. Returns the
    /// request's own result.
    pub async fn mutate<R, F>(&self, request: F) -> Result<R, CoreError>
    where
        F: Future<Output = Result<R, CoreError>>,
    {
        let result = request.await;
        if let Err(e) = &result {
            warn!(resource = %self.inner.name, error = %e, "mutation failed");
        }

        // failures are recorded in the cache state
        let _ = self.refresh_now().await;
        result
    }

    fn downgrade(&self) -> std::sync::Weak<CacheInner<T>> {
        Arc::downgrade(&self.inner)
    }

    fn from_inner(inner: Arc<CacheInner<T>>) -> Self {
        Self { inner }
    }
}
