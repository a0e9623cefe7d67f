// ── Sync service ──
//
// Explicitly constructed service that wires the event bus, the push
// connection and the resource caches together. Consumers receive it by
// value (it is a cheap clone) instead of reaching for process globals.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tradedash_api::models::{BlacklistEntry, CoinsResponse, DashboardSnapshot, Health, TradeNotice};
use tradedash_api::{DashboardClient, PushConnector, TransportConfig, WebSocketConnector};

use crate::bus::{EventBus, Handler, Subscription};
use crate::config::SyncConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::CoreError;
use crate::resource::{PushRule, ResourceCache};

const NOTICE_CHANNEL_SIZE: usize = 256;

/// Push event types understood by the service.
pub mod events {
    /// `{dashboard, coins, blacklist}` sent once per connection.
    pub const INITIAL_STATE: &str = "initial_state";
    /// Full dashboard snapshot.
    pub const DASHBOARD_UPDATE: &str = "dashboard_update";
    /// Blacklist changed; coin rows are stale.
    pub const BLACKLIST_UPDATED: &str = "blacklist_updated";
    pub const TRADE_EXECUTED: &str = tradedash_api::models::TradeNotice::TRADE_EXECUTED;
    pub const POSITION_CLOSED: &str = tradedash_api::models::TradeNotice::POSITION_CLOSED;
}

// ── SyncService ──────────────────────────────────────────────────

/// Entry point for consumers.
///
/// Cheaply cloneable via `Arc<SyncInner>`. Construction wires the caches to
/// the bus but does no I/O; call [`start`](Self::start) to connect and begin
/// polling, and [`teardown`](Self::teardown) to stop.
pub struct SyncService<C: PushConnector = WebSocketConnector> {
    inner: Arc<SyncInner<C>>,
}

impl<C: PushConnector> Clone for SyncService<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: PushConnector> std::fmt::Debug for SyncService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("connection", &self.inner.connection.state())
            .field("dashboard", &self.inner.dashboard)
            .field("coins", &self.inner.coins)
            .field("blacklist", &self.inner.blacklist)
            .finish_non_exhaustive()
    }
}

struct SyncInner<C: PushConnector> {
    config: SyncConfig,
    api: DashboardClient,
    bus: EventBus,
    connection: ConnectionManager<C>,
    dashboard: ResourceCache<DashboardSnapshot>,
    coins: ResourceCache<CoinsResponse>,
    blacklist: ResourceCache<Vec<BlacklistEntry>>,
    notice_tx: broadcast::Sender<TradeNotice>,
    /// Kept so notice handlers live as long as the service.
    notice_subs: Vec<Subscription>,
    running: Mutex<Option<Running>>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: PushConnector> Drop for SyncInner<C> {
    fn drop(&mut self) {
        for sub in &self.notice_subs {
            sub.unsubscribe();
        }
    }
}

impl SyncService<WebSocketConnector> {
    /// Build a service talking REST and WebSocket to `config.base_url`.
    pub fn new(config: SyncConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let api = DashboardClient::new(config.base_url.clone(), &transport)?;
        let connector = WebSocketConnector::new(config.push_url()?);
        Ok(Self::with_connector(config, api, connector))
    }
}

impl<C: PushConnector> SyncService<C> {
    /// Build a service from explicit collaborators.
    pub fn with_connector(config: SyncConfig, api: DashboardClient, connector: C) -> Self {
        let bus = EventBus::new();
        let connection = ConnectionManager::new(connector, bus.clone(), config.reconnect);

        let dashboard = {
            let api = api.clone();
            ResourceCache::new("dashboard", move || {
                let api = api.clone();
                async move { api.get_dashboard().await.map_err(CoreError::from) }
            })
        };
        dashboard.bind(
            &bus,
            [
                PushRule::replace_at(events::INITIAL_STATE, "/dashboard"),
                PushRule::replace(events::DASHBOARD_UPDATE),
            ],
        );

        let coins = {
            let api = api.clone();
            ResourceCache::new("coins", move || {
                let api = api.clone();
                async move { api.list_coins().await.map_err(CoreError::from) }
            })
        };
        coins.bind(&bus, [PushRule::invalidate(events::BLACKLIST_UPDATED)]);

        let blacklist = {
            let api = api.clone();
            ResourceCache::new("blacklist", move || {
                let api = api.clone();
                async move {
                    api.list_coins()
                        .await
                        .map(|resp| blacklist_from_coins(&resp))
                        .map_err(CoreError::from)
                }
            })
        };
        blacklist.bind(
            &bus,
            [
                PushRule::replace_at(events::INITIAL_STATE, "/blacklist"),
                PushRule::replace_at(events::BLACKLIST_UPDATED, "/blacklist"),
            ],
        );

        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let notice_subs = [events::TRADE_EXECUTED, events::POSITION_CLOSED]
            .into_iter()
            .map(|event_type| {
                let tx = notice_tx.clone();
                bus.subscribe_fn(event_type, move |data| match TradeNotice::from_event(event_type, data) {
                    Some(notice) => {
                        // no receivers is fine
                        let _ = tx.send(notice);
                    }
                    None => debug!(event_type, "dropping undecodable trade notice"),
                })
            })
            .collect();

        Self {
            inner: Arc::new(SyncInner {
                config,
                api,
                bus,
                connection,
                dashboard,
                coins,
                blacklist,
                notice_tx,
                notice_subs,
                running: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &DashboardClient {
        &self.inner.api
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Connect the push channel (if enabled), start fallback polling and
    /// kick off the initial pulls. No-op if already started.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self) {
        let mut running = self.inner.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            debug!("sync service already started");
            return;
        }

        let cancel = CancellationToken::new();
        let period = self.inner.config.poll_interval;

        if self.inner.config.push_enabled {
            self.inner.connection.start();
        }

        let tasks = vec![
            self.inner
                .dashboard
                .spawn_polling(self.inner.connection.subscribe_state(), period, cancel.clone()),
            self.inner
                .coins
                .spawn_polling(self.inner.connection.subscribe_state(), period, cancel.clone()),
            self.inner
                .blacklist
                .spawn_polling(self.inner.connection.subscribe_state(), period, cancel.clone()),
        ];

        // initial pulls are fire-and-forget; teardown does not wait for them
        let svc = self.clone();
        tokio::spawn(async move {
            if let Err(e) = svc.refresh_all().await {
                warn!(error = %e, "initial pull failed");
            }
        });

        *running = Some(Running { cancel, tasks });
        info!(
            base_url = %self.inner.config.base_url,
            push = self.inner.config.push_enabled,
            "sync service started"
        );
    }

    /// Close the push channel, cancel any pending reconnect, and stop polling.
    ///
    /// In-flight pulls are left to complete.
    pub async fn teardown(&self) {
        let running = self.inner.running.lock().unwrap_or_else(PoisonError::into_inner).take();

        self.inner.connection.teardown().await;

        if let Some(Running { cancel, tasks }) = running {
            cancel.cancel();
            for task in tasks {
                if let Err(e) = task.await {
                    warn!(error = %e, "polling task ended abnormally");
                }
            }
        }
        debug!("sync service stopped");
    }

    /// Pull every resource now.
    ///
    /// All pulls run; the first failure (if any) is returned.
    pub async fn refresh_all(&self) -> Result<(), CoreError> {
        let (dashboard, coins, blacklist) = tokio::join!(
            self.inner.dashboard.refresh_now(),
            self.inner.coins.refresh_now(),
            self.inner.blacklist.refresh_now(),
        );
        dashboard?;
        coins?;
        blacklist?;
        Ok(())
    }

    // ── Push channel ─────────────────────────────────────────────

    /// Send `{type, ...payload}` if the push channel is open.
    pub fn send(&self, event_type: &str, payload: &Value) -> bool {
        self.inner.connection.send(event_type, payload)
    }

    /// Register a handler on the service's event bus.
    pub fn subscribe(&self, event_type: impl Into<String>, handler: Handler) -> Subscription {
        self.inner.bus.subscribe(event_type, handler)
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Subscribe to push connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe_state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_open()
    }

    /// Subscribe to `trade_executed` / `position_closed` notices.
    pub fn trade_notices(&self) -> broadcast::Receiver<TradeNotice> {
        self.inner.notice_tx.subscribe()
    }

    // ── Resources ────────────────────────────────────────────────

    pub fn dashboard(&self) -> &ResourceCache<DashboardSnapshot> {
        &self.inner.dashboard
    }

    pub fn coins(&self) -> &ResourceCache<CoinsResponse> {
        &self.inner.coins
    }

    /// Pushes carry full entries; a pull rebuilds them from the coin rows
    /// and so drops `added_at` and `reason`.
    pub fn blacklist(&self) -> &ResourceCache<Vec<BlacklistEntry>> {
        &self.inner.blacklist
    }

    pub async fn health(&self) -> Result<Health, CoreError> {
        Ok(self.inner.api.health().await?)
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Blacklist `coin`, then re-pull coins and blacklist.
    pub async fn add_to_blacklist(&self, coin: &str) -> Result<(), CoreError> {
        self.set_blacklisted(coin, true).await
    }

    /// Un-blacklist `coin`, then re-pull coins and blacklist.
    pub async fn remove_from_blacklist(&self, coin: &str) -> Result<(), CoreError> {
        self.set_blacklisted(coin, false).await
    }

    /// Flip the `blacklisted` flag of a coin row as the coin cache last saw it.
    pub async fn toggle_blacklist(&self, coin: &str) -> Result<bool, CoreError> {
        let currently = self
            .inner
            .coins
            .get()
            .and_then(|resp| resp.coins.iter().find(|c| c.coin == coin).map(|c| c.blacklisted))
            .unwrap_or(false);
        let target = !currently;
        self.set_blacklisted(coin, target).await?;
        Ok(target)
    }

    /// Issue the mutation and reconcile by pulling; the cached rows are
    /// never edited locally.
    pub async fn set_blacklisted(&self, coin: &str, blacklisted: bool) -> Result<(), CoreError> {
        let api = &self.inner.api;
        let result = self
            .inner
            .coins
            .mutate(async {
                let response = if blacklisted {
                    api.add_to_blacklist(coin).await
                } else {
                    api.remove_from_blacklist(coin).await
                };
                response.map(drop).map_err(CoreError::from)
            })
            .await;

        // failures are recorded in the cache state
        let _ = self.inner.blacklist.refresh_now().await;
        result
    }
}

fn blacklist_from_coins(resp: &CoinsResponse) -> Vec<BlacklistEntry> {
    resp.coins
        .iter()
        .filter(|c| c.blacklisted)
        .map(|c| BlacklistEntry {
            coin: c.coin.clone(),
            ..BlacklistEntry::default()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tradedash_api::models::CoinMarket;

    use super::*;

    #[test]
    fn blacklist_is_derived_from_flagged_rows() {
        let resp = CoinsResponse {
            coins: vec![
                CoinMarket {
                    coin: "BTC".into(),
                    ..CoinMarket::default()
                },
                CoinMarket {
                    coin: "DOGE".into(),
                    blacklisted: true,
                    ..CoinMarket::default()
                },
            ],
            total: 2,
        };
        let entries = blacklist_from_coins(&resp);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].coin, "DOGE");
        assert_eq!(entries[0].added_at, None);
        assert!(entries[0].reason.is_empty());
    }
}
