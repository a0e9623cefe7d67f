// tradedash-core: Reactive sync layer between tradedash-api and consumers (CLI, embedders).

pub mod bus;
pub mod config;
pub mod connection;
pub mod error;
pub mod resource;
pub mod sync;
pub mod table;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{EventBus, Handler, Subscription};
pub use config::{ReconnectPolicy, SyncConfig};
pub use connection::{ConnectionManager, ConnectionState};
pub use error::CoreError;
pub use resource::{Freshness, PushRule, ResourceCache, ResourceState};
pub use sync::{SyncService, events};
pub use table::{
    CellValue, Column, ColumnKind, ProjectedRow, SortDirection, SortSpec, TableProjection, TableRow, ViewTable,
};

// Wire models are part of the public surface.
pub use tradedash_api::models::{
    BlacklistEntry, ClosedTrade, CoinMarket, CoinsResponse, DashboardSnapshot, Health, OpenPosition, TradeNotice,
    WinRate,
};
