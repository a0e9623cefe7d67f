// Wire models for the dashboard backend.
//
// Every field is defaulted: the push channel sends partial snapshots and
// the backend adds fields over time. Unknown fields are kept in `extra`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full dashboard snapshot (`GET /api/dashboard`, `dashboard_update`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSnapshot {
    /// `"running"` while the bot is up.
    pub status: Option<String>,
    /// `"paper"` or `"live"`.
    pub mode: Option<String>,
    pub equity: Option<f64>,
    pub cash: Option<f64>,
    pub initial_balance: Option<f64>,
    pub total_pnl: Option<f64>,
    pub return_pct: Option<f64>,
    pub open_positions: Vec<OpenPosition>,
    pub closed_trades: Vec<ClosedTrade>,
    pub win_rate: Option<WinRate>,
    pub active_rules: Option<u32>,
    /// `[kind, length]`, e.g. `["win", 3]`.
    pub streak: Option<(String, i64)>,
    pub position_size_modifier: Option<f64>,
    pub lessons: Vec<String>,
    pub agent_accuracy: Map<String, Value>,
    pub last_updated: Option<DateTime<Utc>>,

    /// All remaining fields the backend sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenPosition {
    pub coin: String,
    /// `"long"` or `"short"`.
    pub side: String,
    pub entry_price: Option<f64>,
    pub current_price: Option<f64>,
    pub size: Option<f64>,
    pub unrealized_pnl: Option<f64>,
    pub leverage: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosedTrade {
    pub coin: String,
    pub side: String,
    pub entry: Option<f64>,
    pub exit: Option<f64>,
    pub size: Option<f64>,
    pub pnl: Option<f64>,
    pub reason: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinRate {
    pub total: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
}

/// `GET /api/coins` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinsResponse {
    pub coins: Vec<CoinMarket>,
    pub total: usize,
}

/// One tradable coin with market data and journal statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinMarket {
    pub coin: String,
    pub mark_price: Option<f64>,
    pub funding_rate: Option<f64>,
    pub open_interest: Option<f64>,
    pub trade_count: u32,
    /// `None` until the coin has closed trades.
    pub win_rate: Option<f64>,
    pub total_pnl: Option<f64>,
    pub confidence_adjustment: f64,
    pub blacklisted: bool,
}

/// Blacklist entry as broadcast in `initial_state` and `blacklist_updated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistEntry {
    pub coin: String,
    pub added_at: Option<String>,
    pub reason: String,
}

/// Body of `POST /api/coins/blacklist`.
#[derive(Debug, Clone, Serialize)]
pub struct BlacklistRequest<'a> {
    pub coin: &'a str,
}

/// `GET /health` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Health {
    pub status: String,
    pub mode: String,
    pub uptime_seconds: u64,
    pub signals_received: u64,
}

/// Trade activity pushed by the backend (`trade_executed`, `position_closed`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TradeNotice {
    TradeExecuted {
        coin: String,
        side: String,
        #[serde(default)]
        size: Option<f64>,
        #[serde(default)]
        price: Option<f64>,
    },
    PositionClosed {
        coin: String,
        side: String,
        #[serde(default)]
        pnl: Option<f64>,
    },
}

impl TradeNotice {
    pub const TRADE_EXECUTED: &'static str = "trade_executed";
    pub const POSITION_CLOSED: &'static str = "position_closed";

    /// Decode a notice from an event type and its `data` payload.
    ///
    /// Returns `None` for other event types or malformed payloads.
    pub fn from_event(event_type: &str, data: &Value) -> Option<Self> {
        if event_type != Self::TRADE_EXECUTED && event_type != Self::POSITION_CLOSED {
            return None;
        }
        let tagged = serde_json::json!({ "type": event_type, "data": data });
        serde_json::from_value(tagged).ok()
    }

    pub fn coin(&self) -> &str {
        match self {
            Self::TradeExecuted { coin, .. } | Self::PositionClosed { coin, .. } => coin,
        }
    }
}
