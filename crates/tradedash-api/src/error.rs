use thiserror::Error;

/// Top-level error type for the `tradedash-api` crate.
///
/// Covers the REST surface and the push channel. `tradedash-core` maps
/// these into the request/transport fault taxonomy its consumers see.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The server answered with a non-2xx status.
    #[error("Request to {path} failed (HTTP {status}): {body}")]
    Status { status: u16, path: String, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Outbound payloads are spread into the envelope, so they must be objects.
    #[error("Outbound payload must be a JSON object, got {0}")]
    InvalidPayload(&'static str),

    // ── Push channel ────────────────────────────────────────────────
    /// Push channel handshake failed.
    #[error("Push channel connection failed: {0}")]
    PushConnect(String),

    /// Push channel failed mid-session (read side).
    #[error("Push channel transport error: {0}")]
    PushTransport(String),

    /// Writing a frame to the push channel failed.
    #[error("Push channel send failed: {0}")]
    PushSend(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status >= 500,
            Self::PushConnect(_) | Self::PushTransport(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Status { status: 404, .. } => true,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
