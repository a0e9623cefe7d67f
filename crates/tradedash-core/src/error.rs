// ── Core error types ──
//
// Errors surfaced by tradedash-core. Only request faults ever reach
// consumers: transport and decode faults are absorbed by the connection
// manager. The `From<tradedash_api::Error>` impl maps wire-level errors
// into this taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone` so a cache can hold its last failure alongside the stale value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Push channel is not open")]
    NotConnected,

    // ── Request errors ───────────────────────────────────────────────
    #[error("Request failed: {message}")]
    Request {
        message: String,
        /// HTTP status code (if the server answered).
        status: Option<u16>,
    },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Unexpected response body: {message}")]
    Decode { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tradedash_api::Error> for CoreError {
    fn from(err: tradedash_api::Error) -> Self {
        use tradedash_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map(ToString::to_string).unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Request {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::Status { status: 404, path, .. } => CoreError::NotFound { path },
            ApiError::Status { status, body, .. } => CoreError::Request {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {body}")
                },
                status: Some(status),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Decode { message },
            ApiError::InvalidPayload(kind) => CoreError::Internal(format!("outbound payload was {kind}")),
            ApiError::PushConnect(reason) | ApiError::PushTransport(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            ApiError::PushSend(_) => CoreError::NotConnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_map_to_request_faults() {
        let err = CoreError::from(tradedash_api::Error::Status {
            status: 500,
            path: "/api/coins".into(),
            body: "boom".into(),
        });
        assert_eq!(
            err,
            CoreError::Request {
                message: "HTTP 500: boom".into(),
                status: Some(500),
            }
        );
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = CoreError::from(tradedash_api::Error::Status {
            status: 404,
            path: "/api/coins/blacklist/NOPE".into(),
            body: "<html>Not Found</html>".into(),
        });
        assert_eq!(
            err,
            CoreError::NotFound {
                path: "/api/coins/blacklist/NOPE".into()
            }
        );
        assert_eq!(err.to_string(), "Not found: /api/coins/blacklist/NOPE");
    }

    #[test]
    fn decode_errors_drop_the_body() {
        let err = CoreError::from(tradedash_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert_eq!(
            err,
            CoreError::Decode {
                message: "expected value".into()
            }
        );
    }
}
