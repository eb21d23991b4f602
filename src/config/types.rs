use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

/// Main configuration structure for calproxy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Where the index page lives and how to authenticate against it
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct UpstreamConfig {
    /// URL of the index page listing the source feeds
    #[serde(default)]
    pub target: Option<String>,

    /// Basic auth user
    #[serde(default)]
    pub user: String,

    /// Basic auth password
    #[serde(default)]
    pub pass: String,

    /// Whole-request timeout for a single fetch
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Refresh cycle behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RefreshConfig {
    /// Time between refresh cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Size of the admission pool for source fetches
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Upper bound on one refresh cycle; in-flight fetches are cancelled after it
    #[serde(default = "default_cycle_timeout_secs")]
    pub cycle_timeout_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,
}

/// Values taken from flags or environment variables
///
/// Each `Some` replaces the corresponding file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub listen: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    2 * 60 * 60
}

fn default_max_concurrent_fetches() -> usize {
    5
}

fn default_cycle_timeout_secs() -> u64 {
    10 * 60
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            target: None,
            user: String::new(),
            pass: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            cycle_timeout_secs: default_cycle_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Config {
    /// Applies flag/environment overrides on top of this configuration
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(target) = overrides.target {
            self.upstream.target = Some(target);
        }
        if let Some(user) = overrides.user {
            self.upstream.user = user;
        }
        if let Some(pass) = overrides.pass {
            self.upstream.pass = pass;
        }
        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }
    }

    /// Parses the configured index page URL
    pub fn target_url(&self) -> ConfigResult<Url> {
        let target = self
            .upstream
            .target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingTarget)?;

        let url = Url::parse(target)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid target '{}': {}", target, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Target '{}' must use http or https",
                target
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Target '{}' has no host",
                target
            )));
        }

        Ok(url)
    }

    /// Parses the listen address
    pub fn listen_addr(&self) -> ConfigResult<SocketAddr> {
        self.server.listen.parse().map_err(|e| {
            ConfigError::Validation(format!(
                "Invalid listen address '{}': {}",
                self.server.listen, e
            ))
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh.cycle_timeout_secs)
    }
}
