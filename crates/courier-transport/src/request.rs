//! Request construction from transport options.
//!
//! Headers and the destination are validated once when the transport is
//! built; each event then only clones the template and attaches its body.

use bytes::Bytes;
use courier_core::{DeliveryError, Event, Result, Url};
use http::{
    header::{CONTENT_TYPE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue, Method,
};

use crate::options::TransportOptions;

/// Client identifier sent with every request.
pub const CLIENT_NAME: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Header carrying collector authentication.
pub const AUTH_HEADER: &str = "x-sentry-auth";

/// Response header the collector uses to explain a rejection.
pub const ERROR_REASON_HEADER: &str = "x-sentry-error";

/// Everything needed to perform one delivery's HTTP exchange.
#[derive(Debug, Clone)]
pub struct RequestParams {
    /// Always POST.
    pub method: Method,
    /// Collector store URL.
    pub url: Url,
    /// Default headers merged with caller-supplied headers.
    pub headers: HeaderMap,
    /// JSON serialization of the event.
    pub body: Bytes,
}

impl RequestParams {
    /// Destination scheme, `http` or `https`.
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Destination host.
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Destination port, falling back to the scheme's default.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    /// Destination path.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Validated, event-independent part of every request.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    url: Url,
    headers: HeaderMap,
}

impl RequestTemplate {
    /// Validates the destination and headers from `options`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` for a non-HTTP destination, a
    /// destination without a host, or a header that is not valid HTTP.
    pub fn from_options(options: &TransportOptions) -> Result<Self> {
        let url = options.destination.store_url.clone();
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DeliveryError::configuration(format!(
                "unsupported destination scheme '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(DeliveryError::configuration(format!("destination {url} has no host")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_NAME));
        headers.insert(
            HeaderName::from_static(AUTH_HEADER),
            header_value(AUTH_HEADER, &options.destination.auth_header(CLIENT_NAME))?,
        );

        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                DeliveryError::configuration(format!("invalid header name '{name}': {e}"))
            })?;
            headers.insert(header_name, header_value(name, value)?);
        }

        Ok(Self { url, headers })
    }

    /// Builds the request for one event.
    pub fn build(&self, event: &Event) -> RequestParams {
        RequestParams {
            method: Method::POST,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: Bytes::from(event.to_json()),
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        DeliveryError::configuration(format!("invalid value for header '{name}': {e}"))
    })
}
