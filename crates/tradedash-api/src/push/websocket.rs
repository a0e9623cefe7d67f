//! WebSocket transport for the push channel.
//!
//! Each [`connect`](PushConnector::connect) performs one handshake and
//! splits the socket into a text-frame sink and stream. Ping/pong is
//! answered by tungstenite; binary frames are ignored.

use futures::{SinkExt, StreamExt, future};
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use super::{PushChannel, PushConnector};
use crate::error::Error;

/// Connects to the backend's WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl PushConnector for WebSocketConnector {
    async fn connect(&self) -> Result<PushChannel, Error> {
        tracing::info!(url = %self.url, "Connecting to push channel");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::PushConnect(e.to_string()))?;

        tracing::info!("Push channel handshake complete");

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(|e| Error::PushSend(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, Error>(Message::text(text))));

        let stream = read.filter_map(|frame| future::ready(text_frame(frame)));

        Ok(PushChannel {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Keep text frames and errors; drop control and binary frames.
fn text_frame(frame: Result<Message, tungstenite::Error>) -> Option<Result<String, Error>> {
    match frame {
        Ok(Message::Text(text)) => Some(Ok(text.to_string())),
        Ok(Message::Ping(_)) => {
            tracing::trace!("Push channel ping");
            None
        }
        Ok(Message::Close(frame)) => {
            if let Some(cf) = frame {
                tracing::info!(code = %cf.code, reason = %cf.reason, "Push channel close frame received");
            } else {
                tracing::info!("Push channel close frame received (no payload)");
            }
            None
        }
        Ok(_) => None,
        Err(e) => Some(Err(Error::PushTransport(e.to_string()))),
    }
}
