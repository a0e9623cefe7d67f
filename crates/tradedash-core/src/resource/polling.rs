// ── Fallback polling ──
//
// While the push channel is not open, a cache re-pulls on a fixed interval.
// Once the channel opens, push is assumed sufficient and the timer idles.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ResourceCache;
use crate::connection::ConnectionState;

impl<T: Send + Sync + 'static> ResourceCache<T> {
    /// Spawn the polling task for this cache.
    ///
    /// The first pull fires one `period` after the channel leaves Open (or
    /// after spawning, if it is not open). Flapping between Connecting and
    /// Disconnected does not restart the timer.
    pub fn spawn_polling(
        &self,
        connection: watch::Receiver<ConnectionState>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(poll_task(self.clone(), connection, period, cancel))
    }
}

async fn poll_task<T: Send + Sync + 'static>(
    cache: ResourceCache<T>,
    mut connection: watch::Receiver<ConnectionState>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    let mut open = *connection.borrow_and_update() == ConnectionState::Open;
    let mut watching = true;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = connection.changed(), if watching => {
                let now_open = if changed.is_ok() {
                    *connection.borrow_and_update() == ConnectionState::Open
                } else {
                    // connection manager is gone; pull-only from here on
                    watching = false;
                    false
                };
                if open && !now_open {
                    ticker.reset();
                }
                if open != now_open {
                    debug!(resource = %cache.name(), polling = !now_open, "polling toggled");
                }
                open = now_open;
            }
            _ = ticker.tick(), if !open => {
                debug!(resource = %cache.name(), "polling pull");
                // failures are recorded in the cache state
                let _ = cache.refresh_now().await;
            }
        }
    }

    debug!(resource = %cache.name(), "polling stopped");
}
