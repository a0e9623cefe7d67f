// ── Runtime sync configuration ──
//
// Describes *where* the backend lives and how the sync layer paces itself.
// Built by the CLI (or any embedder) and handed in; core never reads files.

use std::time::Duration;

use url::Url;

use crate::error::CoreError;

/// Fixed delay between a push-channel close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Pull cadence while the push channel is down.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Reconnection policy for the push channel.
///
/// Flat delay, no backoff, no jitter. `max_attempts` caps consecutive
/// failed attempts; `None` retries forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Unbounded retries with a flat delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Whether another attempt is permitted after `attempt` consecutive failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Configuration for syncing against one backend.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// REST root, e.g. `http://127.0.0.1:8080`.
    pub base_url: Url,
    /// Push channel URL. Derived from `base_url` when `None`.
    pub push_url: Option<Url>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Pull cadence while the push channel is not open.
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// Disable to run pull-only (one-shot CLI commands).
    pub push_enabled: bool,
}

impl SyncConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            push_url: None,
            timeout: Duration::from_secs(30),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            push_enabled: true,
        }
    }

    /// Resolve the push channel URL: explicit, or `ws(s)://<host>/ws`.
    pub fn push_url(&self) -> Result<Url, CoreError> {
        if let Some(url) = &self.push_url {
            return Ok(url.clone());
        }

        let scheme = match self.base_url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(CoreError::Config {
                    message: format!("cannot derive a push URL from scheme '{other}'"),
                });
            }
        };

        let mut url = self.base_url.clone();
        url.set_scheme(scheme).map_err(|()| CoreError::Config {
            message: format!("cannot switch {} to {scheme}", self.base_url),
        })?;
        url.set_path("/ws");
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_flat_three_seconds_forever() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay, Duration::from_millis(3000));
        assert!(policy.allows(u32::MAX));
    }

    #[test]
    fn capped_policy_stops() {
        let policy = ReconnectPolicy {
            delay: Duration::from_secs(1),
            max_attempts: Some(2),
        };
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }

    #[test]
    fn push_url_is_derived_from_base() {
        let cfg = SyncConfig::new(Url::parse("https://bot.example.com:8443/desk?x=1").unwrap());
        assert_eq!(cfg.push_url().unwrap().as_str(), "wss://bot.example.com:8443/ws");

        let cfg = SyncConfig::new(Url::parse("http://127.0.0.1:8080").unwrap());
        assert_eq!(cfg.push_url().unwrap().as_str(), "ws://127.0.0.1:8080/ws");
    }

    #[test]
    fn explicit_push_url_wins() {
        let mut cfg = SyncConfig::new(Url::parse("http://127.0.0.1:8080").unwrap());
        cfg.push_url = Some(Url::parse("ws://push.local/stream").unwrap());
        assert_eq!(cfg.push_url().unwrap().as_str(), "ws://push.local/stream");
    }
}
