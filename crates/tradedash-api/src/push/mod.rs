//! Push channel: wire envelope codec and pluggable transports.
//!
//! Inbound frames are `{"type": <string>, "data": <any>}`. Outbound frames
//! flatten the payload next to `type`: `{"type": <string>, ...payload}`.
//! The backend depends on this asymmetry, so both directions are kept as-is.
//!
//! Transports implement [`PushConnector`], which yields one [`PushChannel`]
//! (a frame sink plus a frame stream) per physical connection. Reconnection
//! policy lives one layer up, in `tradedash-core`.

mod memory;
mod websocket;

use std::future::Future;
use std::pin::Pin;

use futures::{Sink, Stream};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Error;

pub use memory::{MemoryConnector, MemoryRemote, MemorySession};
pub use websocket::WebSocketConnector;

/// Inbound text frames, in receipt order. `None` means the remote closed.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;

/// Outbound text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// One live physical connection.
pub struct PushChannel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl std::fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushChannel").finish_non_exhaustive()
    }
}

/// Opens physical push connections.
pub trait PushConnector: Send + Sync + 'static {
    /// Perform the handshake and return the connected channel.
    fn connect(&self) -> impl Future<Output = Result<PushChannel, Error>> + Send;
}

// ── Envelope codec ───────────────────────────────────────────────────

/// Decoded inbound envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Parse one inbound text frame.
pub fn decode_frame(text: &str) -> Result<InboundEnvelope, Error> {
    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: text.to_owned(),
    })
}

/// Build one outbound text frame with the payload fields at top level.
///
/// `null` is treated as an empty payload. A payload field named `type`
/// never overrides the event type.
pub fn encode_outbound(event_type: &str, payload: &Value) -> Result<String, Error> {
    let mut envelope = match payload {
        Value::Object(fields) => fields.clone(),
        Value::Null => Map::new(),
        Value::Bool(_) => return Err(Error::InvalidPayload("a boolean")),
        Value::Number(_) => return Err(Error::InvalidPayload("a number")),
        Value::String(_) => return Err(Error::InvalidPayload("a string")),
        Value::Array(_) => return Err(Error::InvalidPayload("an array")),
    };
    envelope.insert("type".into(), Value::String(event_type.to_owned()));

    serde_json::to_string(&Value::Object(envelope)).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: String::new(),
    })
}
