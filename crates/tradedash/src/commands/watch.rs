//! Live mode: keep every cache synchronized and report each change until
//! interrupted.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use tradedash_core::{
    BlacklistEntry, CoinsResponse, ConnectionState, DashboardSnapshot, ResourceState, Subscription, SyncService,
    TradeNotice, events,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Event types logged by `--events`.
const RAW_EVENTS: [&str; 5] = [
    events::INITIAL_STATE,
    events::DASHBOARD_UPDATE,
    events::BLACKLIST_UPDATED,
    events::TRADE_EXECUTED,
    events::POSITION_CLOSED,
];

pub async fn handle(service: &SyncService, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let printer = Printer {
        format: global.output,
        color: output::should_color(global.color),
        quiet: global.quiet,
    };

    let raw_subs: Vec<Subscription> = if args.events {
        RAW_EVENTS
            .into_iter()
            .map(|event_type| {
                service.bus().subscribe_fn(event_type, move |payload: &Value| {
                    info!(event_type, %payload, "push event");
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let mut state_rx = service.connection_state();
    let mut dashboard = Tracked::new(service.dashboard().subscribe());
    let mut coins = Tracked::new(service.coins().subscribe());
    let mut blacklist = Tracked::new(service.blacklist().subscribe());
    let mut notices = service.trade_notices();

    service.start();
    printer.connection(*state_rx.borrow_and_update());

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }

            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                printer.connection(state);
            }

            Some(update) = dashboard.next() => printer.dashboard(&update),
            Some(update) = coins.next() => printer.coins(&update),
            Some(update) = blacklist.next() => printer.blacklist(&update),

            notice = notices.recv() => match notice {
                Ok(notice) => printer.notice(&notice),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "trade notices dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    for sub in &raw_subs {
        sub.unsubscribe();
    }
    service.teardown().await;
    Ok(())
}

// ── Change tracking ──────────────────────────────────────────────────

/// Outcome of a cache write worth reporting.
enum Update<T> {
    Value(Arc<T>),
    Failed(String),
}

/// Wraps a cache receiver and yields only new values and new errors,
/// skipping the `pending` bookkeeping in between.
struct Tracked<T> {
    rx: watch::Receiver<ResourceState<T>>,
    last_value: Option<Arc<T>>,
    last_error: Option<String>,
}

impl<T> Tracked<T> {
    fn new(rx: watch::Receiver<ResourceState<T>>) -> Self {
        Self {
            rx,
            last_value: None,
            last_error: None,
        }
    }

    /// `None` once the cache is gone.
    async fn next(&mut self) -> Option<Update<T>> {
        loop {
            self.rx.changed().await.ok()?;
            let state = self.rx.borrow_and_update();

            let error = state.error.as_ref().map(ToString::to_string);
            if error.is_some() && error != self.last_error {
                self.last_error.clone_from(&error);
                return error.map(Update::Failed);
            }
            self.last_error = error;

            if let Some(value) = &state.value {
                let fresh = self.last_value.as_ref().is_none_or(|last| !Arc::ptr_eq(last, value));
                if fresh {
                    self.last_value = Some(Arc::clone(value));
                    return Some(Update::Value(Arc::clone(value)));
                }
            }
        }
    }
}

// ── Printing ─────────────────────────────────────────────────────────

struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    fn emit(&self, human: String, structured: Value) {
        let line = match self.format {
            OutputFormat::Json | OutputFormat::JsonCompact => structured.to_string(),
            OutputFormat::Table | OutputFormat::Yaml | OutputFormat::Plain => human,
        };
        output::print_output(&line, self.quiet);
    }

    fn connection(&self, state: ConnectionState) {
        self.emit(
            output::connection_badge(state, self.color),
            json!({ "kind": "connection", "state": state.to_string() }),
        );
    }

    fn dashboard(&self, update: &Update<DashboardSnapshot>) {
        match update {
            Update::Value(s) => self.emit(
                format!(
                    "dashboard  equity {}  pnl {}  open {}",
                    output::number(s.equity, 2),
                    output::pnl(s.total_pnl, self.color),
                    s.open_positions.len(),
                ),
                json!({
                    "kind": "dashboard",
                    "equity": s.equity,
                    "total_pnl": s.total_pnl,
                    "open_positions": s.open_positions.len(),
                }),
            ),
            Update::Failed(e) => self.failed("dashboard", e),
        }
    }

    fn coins(&self, update: &Update<CoinsResponse>) {
        match update {
            Update::Value(c) => {
                let flagged = c.coins.iter().filter(|c| c.blacklisted).count();
                self.emit(
                    format!("coins      {} rows, {flagged} blacklisted", c.coins.len()),
                    json!({ "kind": "coins", "rows": c.coins.len(), "blacklisted": flagged }),
                );
            }
            Update::Failed(e) => self.failed("coins", e),
        }
    }

    fn blacklist(&self, update: &Update<Vec<BlacklistEntry>>) {
        match update {
            Update::Value(entries) => {
                let coins: Vec<&str> = entries.iter().map(|e| e.coin.as_str()).collect();
                let human = if coins.is_empty() {
                    "blacklist  (empty)".to_owned()
                } else {
                    format!("blacklist  {}", coins.join(", "))
                };
                self.emit(human, json!({ "kind": "blacklist", "coins": coins }));
            }
            Update::Failed(e) => self.failed("blacklist", e),
        }
    }

    fn notice(&self, notice: &TradeNotice) {
        let human = match notice {
            TradeNotice::TradeExecuted { coin, side, size, price } => format!(
                "trade      {side} {} {coin} @ {}",
                output::number(*size, 4),
                output::number(*price, 4)
            ),
            TradeNotice::PositionClosed { coin, side, pnl } => {
                format!("closed     {side} {coin}  pnl {}", output::pnl(*pnl, self.color))
            }
        };
        let structured = serde_json::to_value(notice).unwrap_or(Value::Null);
        self.emit(human, json!({ "kind": "notice", "notice": structured }));
    }

    fn failed(&self, resource: &str, error: &str) {
        self.emit(
            format!("{resource:<10} pull failed: {error}"),
            json!({ "kind": resource, "error": error }),
        );
    }
}
