use serde::Deserialize;

use crate::scheduler::{DEFAULT_INTERVAL_MS, SchedulerConfig};
use crate::store::ConnectivityPolicy;

/// Base URL of the development backend (local uvicorn).
pub const DEV_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub environment: Environment,
    /// Required in production; defaults to the local backend in development.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    1500
}

impl BackendConfig {
    pub fn resolved_base_url(&self) -> Option<&str> {
        match (&self.base_url, self.environment) {
            (Some(url), _) => Some(url.as_str()),
            (None, Environment::Development) => Some(DEV_BASE_URL),
            (None, Environment::Production) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Consecutive failed cycles before connectivity is degraded.
    #[serde(default = "default_degraded_after")]
    pub degraded_after: u32,
    /// Consecutive failed cycles before connectivity is disconnected.
    #[serde(default = "default_disconnected_after")]
    pub disconnected_after: u32,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_degraded_after() -> u32 {
    ConnectivityPolicy::default().degraded_after
}

fn default_disconnected_after() -> u32 {
    ConnectivityPolicy::default().disconnected_after
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            degraded_after: default_degraded_after(),
            disconnected_after: default_disconnected_after(),
        }
    }
}

impl PollingConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval_ms: self.interval_ms,
            policy: ConnectivityPolicy {
                degraded_after: self.degraded_after,
                disconnected_after: self.disconnected_after,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Ping interval for /ws/state clients.
    #[serde(default = "default_ws_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,
}

fn default_ws_ping_interval_secs() -> u64 {
    30
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            ws_ping_interval_secs: default_ws_ping_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Reads `CONFIG_FILE` (default `config.toml`).
    /// `BACKEND_BASE_URL` overrides `backend.base_url`.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config: AppConfig = toml::from_str(&s)?;
        if let Ok(url) = std::env::var("BACKEND_BASE_URL") {
            config.backend.base_url = Some(url);
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Backend base URL after environment defaults. Validated on load.
    pub fn base_url(&self) -> &str {
        self.backend.resolved_base_url().unwrap_or(DEV_BASE_URL)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base_url = self.backend.resolved_base_url().ok_or_else(|| {
            anyhow::anyhow!(
                "backend.base_url is required when backend.environment = \"production\""
            )
        })?;
        let parsed = reqwest::Url::parse(base_url).map_err(|e| {
            anyhow::anyhow!("backend.base_url is not a valid url ({}): {}", e, base_url)
        })?;
        anyhow::ensure!(
            matches!(parsed.scheme(), "http" | "https"),
            "backend.base_url must use http or https, got {}",
            base_url
        );
        anyhow::ensure!(
            self.backend.request_timeout_ms > 0,
            "backend.request_timeout_ms must be > 0, got {}",
            self.backend.request_timeout_ms
        );
        anyhow::ensure!(
            self.polling.interval_ms > 0,
            "polling.interval_ms must be > 0, got {}",
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.backend.request_timeout_ms <= self.polling.interval_ms,
            "backend.request_timeout_ms ({}) must not exceed polling.interval_ms ({})",
            self.backend.request_timeout_ms,
            self.polling.interval_ms
        );
        anyhow::ensure!(
            self.polling.degraded_after > 0,
            "polling.degraded_after must be > 0, got {}",
            self.polling.degraded_after
        );
        anyhow::ensure!(
            self.polling.disconnected_after >= self.polling.degraded_after,
            "polling.disconnected_after ({}) must be >= polling.degraded_after ({})",
            self.polling.disconnected_after,
            self.polling.degraded_after
        );
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.publishing.ws_ping_interval_secs > 0,
            "publishing.ws_ping_interval_secs must be > 0, got {}",
            self.publishing.ws_ping_interval_secs
        );
        Ok(())
    }
}
