// REST client for the dashboard backend.
//
// Wraps `reqwest::Client` with URL construction and status handling.
// Any non-2xx response is a request failure; bodies are decoded only
// after the status check.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{BlacklistRequest, CoinsResponse, DashboardSnapshot, Health};
use crate::transport::TransportConfig;

/// Raw HTTP client for the dashboard backend's REST surface.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DashboardClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/dashboard`
    pub async fn get_dashboard(&self) -> Result<DashboardSnapshot, Error> {
        self.get(self.url(&["api", "dashboard"])?).await
    }

    /// `GET /api/coins`
    pub async fn list_coins(&self) -> Result<CoinsResponse, Error> {
        self.get(self.url(&["api", "coins"])?).await
    }

    /// `POST /api/coins/blacklist` with `{coin}`.
    ///
    /// The response body is returned as-is; callers reconcile through a
    /// fresh pull rather than trusting it.
    pub async fn add_to_blacklist(&self, coin: &str) -> Result<Value, Error> {
        let url = self.url(&["api", "coins", "blacklist"])?;
        self.post(url, &BlacklistRequest { coin }).await
    }

    /// `DELETE /api/coins/blacklist/:coin`
    pub async fn remove_from_blacklist(&self, coin: &str) -> Result<Value, Error> {
        self.delete(self.url(&["api", "coins", "blacklist", coin])?).await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<Health, Error> {
        self.get(self.url(&["health"])?).await
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, body: &impl Serialize) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        parse_response(resp).await
    }

    async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        parse_response(resp).await
    }
}

/// Check the status, then decode the JSON body.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let path = resp.url().path().to_owned();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            path,
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
