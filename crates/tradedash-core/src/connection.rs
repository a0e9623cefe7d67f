// ── Push connection lifecycle ──
//
// Owns the single logical push connection: connect, decode inbound frames
// onto the event bus, gate outbound sends on the Open state, and reconnect
// after a fixed delay whenever the transport closes without teardown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use strum::Display;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tradedash_api::push::{self, PushChannel, PushConnector};

use crate::bus::EventBus;
use crate::config::ReconnectPolicy;

/// Push connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

// ── ConnectionManager ────────────────────────────────────────────

/// Manages one push connection at a time.
///
/// Cheaply cloneable via `Arc<ManagerInner>`. At most one worker task runs;
/// the worker holds at most one physical transport, so connect attempts
/// never overlap.
pub struct ConnectionManager<C: PushConnector> {
    inner: Arc<ManagerInner<C>>,
}

impl<C: PushConnector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: PushConnector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

struct ManagerInner<C> {
    connector: C,
    bus: EventBus,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    /// Sender for the live session's outbound queue. `Some` only while Open.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C: PushConnector> ConnectionManager<C> {
    pub fn new(connector: C, bus: EventBus, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ManagerInner {
                connector,
                bus,
                policy,
                state,
                outbound: Mutex::new(None),
                worker: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the connection worker. No-op while a worker is running.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self) {
        let mut worker = lock(&self.inner.worker);
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            debug!("connection worker already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&self.inner), cancel.clone()));
        *worker = Some(Worker { cancel, handle });
    }

    /// Cancel any pending reconnect, close the transport, and stop.
    ///
    /// No connect attempt is issued after this returns.
    pub async fn teardown(&self) {
        let worker = lock(&self.inner.worker).take();
        if let Some(Worker { cancel, handle }) = worker {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "connection worker ended abnormally");
            }
        }
        lock(&self.inner.outbound).take();
        self.inner.state.send_replace(ConnectionState::Disconnected);
        debug!("connection torn down");
    }

    // ── Outbound ─────────────────────────────────────────────────

    /// Queue `{type, ...payload}` on the open connection.
    ///
    /// Returns `false` when the frame was dropped: not Open, or the payload
    /// is not an object. Nothing is queued for later delivery.
    pub fn send(&self, event_type: &str, payload: &Value) -> bool {
        let outbound = lock(&self.inner.outbound);
        let Some(tx) = outbound.as_ref() else {
            debug!(event_type, "send while not open; dropped");
            return false;
        };

        match push::encode_outbound(event_type, payload) {
            Ok(frame) => tx.send(frame).is_ok(),
            Err(e) => {
                debug!(event_type, error = %e, "outbound payload rejected");
                false
            }
        }
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Subscribe to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

// ── Worker loop ──────────────────────────────────────────────────

async fn run<C: PushConnector>(inner: Arc<ManagerInner<C>>, cancel: CancellationToken) {
    let mut attempt: u32 = 0;

    loop {
        inner.state.send_replace(ConnectionState::Connecting);

        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            result = inner.connector.connect() => match result {
                Ok(channel) => {
                    attempt = 0;
                    run_session(&inner, channel, &cancel).await;
                }
                Err(e) => warn!(error = %e, attempt, "push connect failed"),
            },
        }

        lock(&inner.outbound).take();
        inner.state.send_replace(ConnectionState::Disconnected);

        if cancel.is_cancelled() {
            break;
        }

        attempt = attempt.saturating_add(1);
        if !inner.policy.allows(attempt) {
            warn!(attempt, "push reconnection limit reached, giving up");
            break;
        }

        let delay = inner.policy.delay;
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt, "push channel closed, reconnecting"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("connection worker exiting");
}

/// Drive one open connection until it closes or is cancelled.
async fn run_session<C>(inner: &ManagerInner<C>, channel: PushChannel, cancel: &CancellationToken) {
    let PushChannel { mut sink, mut stream } = channel;
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    *lock(&inner.outbound) = Some(tx);
    inner.state.send_replace(ConnectionState::Open);
    info!("push channel open");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "closing push channel failed");
                }
                return;
            }
            Some(frame) = rx.recv() => {
                if let Err(e) = sink.send(frame).await {
                    warn!(error = %e, "push send failed, closing");
                    return;
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(text)) => handle_frame(&inner.bus, &text),
                Some(Err(e)) => {
                    warn!(error = %e, "push transport error, closing");
                    if let Err(e) = sink.close().await {
                        debug!(error = %e, "closing push channel failed");
                    }
                    return;
                }
                None => {
                    info!("push channel closed by remote");
                    return;
                }
            },
        }
    }
}

/// Decode one frame and dispatch it. Malformed frames are dropped.
fn handle_frame(bus: &EventBus, text: &str) {
    match push::decode_frame(text) {
        Ok(envelope) => {
            let handlers = bus.dispatch(&envelope.event_type, &envelope.data);
            debug!(event_type = %envelope.event_type, handlers, "push event dispatched");
        }
        Err(e) => debug!(error = %e, "dropping malformed push frame"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;
    use tradedash_api::push::{MemoryConnector, MemoryRemote};

    use super::*;

    const DELAY: Duration = Duration::from_millis(3000);

    fn manager() -> (ConnectionManager<MemoryConnector>, MemoryRemote) {
        let (connector, remote) = MemoryConnector::pair();
        let manager = ConnectionManager::new(connector, EventBus::new(), ReconnectPolicy::fixed(DELAY));
        (manager, remote)
    }

    async fn wait_for(rx: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
        rx.wait_for(|s| *s == want).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_each_close_with_fixed_delay() {
        let (manager, mut remote) = manager();
        let mut state = manager.subscribe_state();
        manager.start();

        let mut connected_at = Vec::new();
        for _ in 0..4 {
            let session = remote.accept().await.unwrap();
            connected_at.push(Instant::now());
            wait_for(&mut state, ConnectionState::Open).await;
            session.close();
            wait_for(&mut state, ConnectionState::Disconnected).await;
        }
        let _fifth = remote.accept().await.unwrap();
        connected_at.push(Instant::now());

        assert_eq!(remote.attempts(), 5);
        for pair in connected_at.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= DELAY && gap < DELAY + Duration::from_millis(5), "gap was {gap:?}");
        }

        manager.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_reconnect() {
        let (manager, mut remote) = manager();
        let mut state = manager.subscribe_state();
        manager.start();

        remote.accept().await.unwrap().close();
        wait_for(&mut state, ConnectionState::Disconnected).await;
        tokio::time::sleep(Duration::from_millis(1000)).await;

        manager.teardown().await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(remote.attempts(), 1);
        assert!(remote.try_accept().is_none());
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failures_retry_on_the_same_delay() {
        let (connector, mut remote) = MemoryConnector::pair();
        let policy = ReconnectPolicy {
            delay: DELAY,
            max_attempts: Some(2),
        };
        let manager = ConnectionManager::new(connector, EventBus::new(), policy);
        remote.refuse();

        manager.start();
        tokio::time::sleep(DELAY / 2).await;
        assert_eq!(remote.attempts(), 1);
        tokio::time::sleep(DELAY).await;
        assert_eq!(remote.attempts(), 2);

        // initial attempt plus two retries, then the cap stops the worker
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(remote.attempts(), 3);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        manager.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_is_dropped_unless_open() {
        let (manager, mut remote) = manager();
        assert!(!manager.send("subscribe", &json!({ "channel": "coins" })));

        let mut state = manager.subscribe_state();
        manager.start();
        let mut session = remote.accept().await.unwrap();
        wait_for(&mut state, ConnectionState::Open).await;

        assert!(manager.send("subscribe", &json!({ "channel": "coins" })));
        let frame: Value = serde_json::from_str(&session.recv().await.unwrap()).unwrap();
        assert_eq!(frame, json!({ "type": "subscribe", "channel": "coins" }));

        assert!(!manager.send("subscribe", &json!("not an object")));

        session.close();
        wait_for(&mut state, ConnectionState::Disconnected).await;
        assert!(!manager.send("subscribe", &json!({})));

        manager.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_decoded_onto_the_bus() {
        let (manager, mut remote) = manager();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.bus().subscribe_fn("dashboard_update", move |data| {
            tx.send(data.clone()).unwrap();
        });

        manager.start();
        let session = remote.accept().await.unwrap();
        assert!(session.push("{ this is not json"));
        assert!(session.push(r#"{"data":{"missing":"type"}}"#));
        assert!(session.push_event("dashboard_update", json!({ "equity": 900 })));

        assert_eq!(rx.recv().await.unwrap(), json!({ "equity": 900 }));
        assert!(rx.try_recv().is_err());
        assert!(manager.is_open());

        manager.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_forces_reconnect() {
        let (manager, mut remote) = manager();
        let mut state = manager.subscribe_state();
        manager.start();

        let first = remote.accept().await.unwrap();
        wait_for(&mut state, ConnectionState::Open).await;
        assert!(first.fail(tradedash_api::Error::PushTransport("reset by peer".into())));
        wait_for(&mut state, ConnectionState::Disconnected).await;

        let before = Instant::now();
        let _second = remote.accept().await.unwrap();
        assert!(before.elapsed() >= DELAY);
        assert_eq!(remote.attempts(), 2);

        manager.teardown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let (manager, mut remote) = manager();
        let mut state = manager.subscribe_state();
        manager.start();
        manager.start();

        let _session = remote.accept().await.unwrap();
        wait_for(&mut state, ConnectionState::Open).await;
        manager.start();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(remote.attempts(), 1);
        manager.teardown().await;
    }
}
