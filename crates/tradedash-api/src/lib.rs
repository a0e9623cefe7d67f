// tradedash-api: Async Rust client for the trading dashboard backend (REST + push channel)

pub mod client;
pub mod error;
pub mod models;
pub mod push;
pub mod transport;

pub use client::DashboardClient;
pub use error::Error;
pub use push::{PushChannel, PushConnector, WebSocketConnector};
pub use transport::TransportConfig;
