//! In-process push transport.
//!
//! [`MemoryConnector`] hands every connection to a [`MemoryRemote`], which
//! plays the backend: it accepts sessions, pushes frames into them, reads
//! what the client sent, and closes them by dropping the session. Used for
//! embedding without a network and for exercising reconnection logic.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};

use super::{PushChannel, PushConnector};
use crate::error::Error;

/// Client side of the in-process transport.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    sessions: mpsc::UnboundedSender<MemorySession>,
    attempts: Arc<AtomicUsize>,
}

/// Backend side of the in-process transport.
#[derive(Debug)]
pub struct MemoryRemote {
    sessions: mpsc::UnboundedReceiver<MemorySession>,
    attempts: Arc<AtomicUsize>,
}

/// One accepted connection, seen from the backend.
///
/// Dropping it (or calling [`close`](Self::close)) ends the client's frame
/// stream, which the client observes as a remote close.
#[derive(Debug)]
pub struct MemorySession {
    frames: mpsc::UnboundedSender<Result<String, Error>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnector {
    /// Create a connected connector/remote pair.
    pub fn pair() -> (Self, MemoryRemote) {
        let (tx, rx) = mpsc::unbounded();
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            Self {
                sessions: tx,
                attempts: Arc::clone(&attempts),
            },
            MemoryRemote {
                sessions: rx,
                attempts,
            },
        )
    }
}

impl PushConnector for MemoryConnector {
    async fn connect(&self) -> Result<PushChannel, Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let (frames_tx, frames_rx) = mpsc::unbounded();
        let (outbound_tx, outbound_rx) = mpsc::unbounded();

        self.sessions
            .unbounded_send(MemorySession {
                frames: frames_tx,
                outbound: outbound_rx,
            })
            .map_err(|_| Error::PushConnect("remote endpoint is gone".into()))?;

        let sink = outbound_tx.sink_map_err(|e| Error::PushSend(e.to_string()));

        Ok(PushChannel {
            sink: Box::pin(sink),
            stream: Box::pin(frames_rx),
        })
    }
}

impl MemoryRemote {
    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Option<MemorySession> {
        self.sessions.next().await
    }

    /// Take a pending connection without waiting.
    pub fn try_accept(&mut self) -> Option<MemorySession> {
        self.sessions.try_recv().ok()
    }

    /// Stop accepting; every later connect attempt fails.
    pub fn refuse(&mut self) {
        self.sessions.close();
    }

    /// Total connect calls made through the paired connector.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MemorySession {
    /// Push one raw text frame. Returns `false` once the client is gone.
    pub fn push(&self, text: impl Into<String>) -> bool {
        self.frames.unbounded_send(Ok(text.into())).is_ok()
    }

    /// Push a `{type, data}` envelope.
    pub fn push_event(&self, event_type: &str, data: serde_json::Value) -> bool {
        let frame = serde_json::json!({ "type": event_type, "data": data });
        self.push(frame.to_string())
    }

    /// Inject a transport error into the client's stream.
    pub fn fail(&self, error: Error) -> bool {
        self.frames.unbounded_send(Err(error)).is_ok()
    }

    /// Next frame the client sent, or `None` once it closed its side.
    pub async fn recv(&mut self) -> Option<String> {
        self.outbound.next().await
    }

    /// Whether the client has dropped its end of the connection.
    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }

    /// Close the connection from the backend side.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let (connector, mut remote) = MemoryConnector::pair();
        let PushChannel { mut sink, mut stream } = connector.connect().await.unwrap();
        let mut session = remote.accept().await.unwrap();

        assert!(session.push(r#"{"type":"ping"}"#));
        assert_eq!(stream.next().await.unwrap().unwrap(), r#"{"type":"ping"}"#);

        sink.send("hello".to_owned()).await.unwrap();
        assert_eq!(session.recv().await.unwrap(), "hello");
        assert_eq!(remote.attempts(), 1);
    }

    #[tokio::test]
    async fn closing_session_ends_stream() {
        let (connector, mut remote) = MemoryConnector::pair();
        let mut channel = connector.connect().await.unwrap();
        remote.accept().await.unwrap().close();

        assert!(channel.stream.next().await.is_none());
    }

    #[tokio::test]
    async fn refused_remote_fails_connects_but_counts_them() {
        let (connector, mut remote) = MemoryConnector::pair();
        remote.refuse();
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_err());
        assert_eq!(remote.attempts(), 2);
    }

    #[tokio::test]
    async fn try_accept_takes_only_pending_sessions() {
        let (connector, mut remote) = MemoryConnector::pair();
        assert!(remote.try_accept().is_none());

        let _channel = connector.connect().await.unwrap();
        assert!(remote.try_accept().is_some());
        assert!(remote.try_accept().is_none());
    }

    #[tokio::test]
    async fn connect_fails_without_remote() {
        let (connector, remote) = MemoryConnector::pair();
        drop(remote);
        assert!(matches!(connector.connect().await, Err(Error::PushConnect(_))));
    }
}
