//! Transport configuration.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use courier_core::Destination;

use crate::{DEFAULT_BUFFER_CAPACITY, DEFAULT_TIMEOUT_SECONDS};

/// Options a transport is built from. Read-only once the transport exists.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Collector endpoint and credentials.
    pub destination: Destination,
    /// Extra request headers. These win over the default headers.
    pub headers: BTreeMap<String, String>,
    /// PEM bundle of additional trusted root certificates.
    pub ca_cert_path: Option<PathBuf>,
    /// Reusable HTTP client and its connection pool.
    ///
    /// When set, it is used as-is and `ca_cert_path`, the proxies and
    /// `timeout` are ignored.
    pub client: Option<reqwest::Client>,
    /// Proxy for `http://` destinations.
    pub http_proxy: Option<String>,
    /// Proxy for `https://` destinations.
    pub https_proxy: Option<String>,
    /// Total timeout for one HTTP exchange.
    pub timeout: Duration,
    /// Maximum number of concurrent deliveries.
    pub buffer_capacity: usize,
}

impl TransportOptions {
    /// Creates options with defaults for everything but the destination.
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            headers: BTreeMap::new(),
            ca_cert_path: None,
            client: None,
            http_proxy: None,
            https_proxy: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Adds an extra request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Trusts the certificates in the PEM bundle at `path`.
    #[must_use]
    pub fn with_ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Reuses an existing client instead of building one.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the per-exchange timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the buffer capacity.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}
