// Backend status endpoints over HTTP (reqwest)

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::instrument;

use crate::error::FetchError;
use crate::version;

/// One of the three polled backend endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    System,
    Services,
    Data,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::System, Endpoint::Services, Endpoint::Data];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::System => "/status/system",
            Endpoint::Services => "/status/services",
            Endpoint::Data => "/status/data",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Source of raw endpoint bodies. Implementations return the body of a 2xx response
/// and map everything else to a `FetchError`.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, endpoint: Endpoint) -> Result<Bytes, FetchError>;
}

/// `StatusSource` backed by a shared reqwest client with a per-request timeout.
pub struct HttpStatusSource {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpStatusSource {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let parsed = Url::parse(base_url)?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "backend base url must be http or https, got {}",
            base_url
        );
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(version::user_agent())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    fn map_transport(&self, endpoint: Endpoint, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                endpoint,
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            FetchError::Network {
                endpoint,
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    #[instrument(skip(self), fields(operation = "fetch_status"))]
    async fn fetch(&self, endpoint: Endpoint) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|e| self.map_transport(endpoint, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        response
            .bytes()
            .await
            .map_err(|e| self.map_transport(endpoint, e))
    }
}
