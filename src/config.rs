//! Configuration for the courier service.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use courier_core::{Destination, Url};
use courier_transport::{TransportOptions, DEFAULT_BUFFER_CAPACITY, DEFAULT_TIMEOUT_SECONDS};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "courier.toml";
const ENV_PREFIX: &str = "COURIER_";

/// Service configuration with defaults, file, and environment overrides.
///
/// Configuration is loaded in priority order:
/// 1. `COURIER_`-prefixed environment variables (highest priority)
/// 2. Configuration file (`courier.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Only the collector destination has no usable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Destination
    /// Collector store endpoint URL.
    ///
    /// Environment variable: `COURIER_STORE_URL`
    #[serde(default)]
    pub store_url: String,
    /// Collector public key.
    ///
    /// Environment variable: `COURIER_PUBLIC_KEY`
    #[serde(default)]
    pub public_key: String,
    /// Legacy collector secret key.
    ///
    /// Environment variable: `COURIER_SECRET_KEY`
    #[serde(default)]
    pub secret_key: Option<String>,

    // Transport
    /// Extra request headers.
    ///
    /// Environment variable: `COURIER_HEADERS`, e.g. `{team=payments}`
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// PEM bundle of extra trusted root certificates.
    ///
    /// Environment variable: `COURIER_CA_CERT_PATH`
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
    /// Proxy for plain HTTP collectors.
    ///
    /// Environment variable: `COURIER_HTTP_PROXY`
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// Proxy for HTTPS collectors.
    ///
    /// Environment variable: `COURIER_HTTPS_PROXY`
    #[serde(default)]
    pub https_proxy: Option<String>,
    /// HTTP exchange timeout in seconds.
    ///
    /// Environment variable: `COURIER_TIMEOUT_SECONDS`
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Maximum concurrent deliveries.
    ///
    /// Environment variable: `COURIER_BUFFER_CAPACITY`
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    // Shutdown
    /// How long shutdown waits for in-flight deliveries, in seconds.
    ///
    /// Environment variable: `COURIER_SHUTDOWN_TIMEOUT_SECONDS`
    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from defaults, `courier.toml`, and the environment.
    pub fn load() -> Result<Self> {
        let config: Self = Self::figment().extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Convert to the transport's options.
    pub fn transport_options(&self) -> Result<TransportOptions> {
        let store_url = Url::parse(&self.store_url).context("Invalid store_url")?;
        let mut destination = Destination::new(store_url, self.public_key.clone());
        if let Some(secret) = &self.secret_key {
            destination = destination.with_secret_key(secret.clone());
        }

        let mut options = TransportOptions::new(destination)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_buffer_capacity(self.buffer_capacity);
        options.headers = self.headers.clone();
        options.ca_cert_path = self.ca_cert_path.clone();
        options.http_proxy = self.http_proxy.clone();
        options.https_proxy = self.https_proxy.clone();

        Ok(options)
    }

    /// Time shutdown waits for in-flight deliveries.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.store_url.is_empty() {
            anyhow::bail!("store_url must be set");
        }

        let store_url = Url::parse(&self.store_url).context("store_url is not a valid URL")?;
        if !matches!(store_url.scheme(), "http" | "https") {
            anyhow::bail!("store_url must use http or https");
        }

        if self.public_key.is_empty() {
            anyhow::bail!("public_key must be set");
        }

        if self.buffer_capacity == 0 {
            anyhow::bail!("buffer_capacity must be greater than 0");
        }

        if self.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            public_key: String::new(),
            secret_key: None,
            headers: BTreeMap::new(),
            ca_cert_path: None,
            http_proxy: None,
            https_proxy: None,
            timeout_seconds: default_timeout_seconds(),
            buffer_capacity: default_buffer_capacity(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

fn default_shutdown_timeout_seconds() -> u64 {
    2
}
