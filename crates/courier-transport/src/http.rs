//! HTTP transport for event delivery.
//!
//! Performs one POST per admitted event, classifies the reply, and always
//! drains the response body before the delivery settles so pooled
//! connections go back to the pool in a reusable state.

use std::{error::Error as StdError, path::Path, time::Instant};

use courier_core::{DeliveryError, Event, Response, Result};
use tracing::{debug, info_span, Instrument};

use crate::{
    buffer::{DeliveryBuffer, DeliveryHandle},
    options::TransportOptions,
    request::{RequestParams, ERROR_REASON_HEADER},
    transport::{BaseTransport, Transport},
};

/// Transport delivering events over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base: BaseTransport,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport, building an HTTP client unless one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` if the destination or headers
    /// are invalid, the trust bundle cannot be loaded, a proxy URL is
    /// invalid, or the client cannot be built.
    pub fn new(options: TransportOptions) -> Result<Self> {
        let client = match &options.client {
            Some(client) => client.clone(),
            None => build_client(&options)?,
        };
        let base = BaseTransport::new(options)?;

        Ok(Self { base, client })
    }

    /// Shared transport state.
    pub fn base(&self) -> &BaseTransport {
        &self.base
    }
}

impl Transport for HttpTransport {
    fn send(&self, event: Event) -> Result<DeliveryHandle> {
        let request = self.base.build_request(&event);
        let span = info_span!(
            "event_delivery",
            event_id = %event.id(),
            url = %request.url,
        );
        let exchange = perform_exchange(self.client.clone(), request).instrument(span);

        self.base.buffer().try_admit(exchange)
    }

    fn buffer(&self) -> &DeliveryBuffer {
        self.base.buffer()
    }
}

/// Sends one request and classifies the reply.
async fn perform_exchange(client: reqwest::Client, request: RequestParams) -> Result<Response> {
    let start_time = Instant::now();
    debug!("sending event");

    let response = client
        .request(request.method, request.url)
        .headers(request.headers)
        .body(request.body)
        .send()
        .await
        .map_err(|e| {
            debug!(duration_ms = start_time.elapsed().as_millis(), "exchange failed: {e}");
            DeliveryError::transport(describe_transport_error(&e))
        })?;

    let code = response.status().as_u16();
    let reason = response
        .headers()
        .get(ERROR_REASON_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    drain_body(response).await;

    debug!(status = code, duration_ms = start_time.elapsed().as_millis(), "exchange settled");

    classify(code, reason)
}

/// Maps a collector reply to a delivery outcome.
///
/// 2xx resolves through the status lookup; anything else is a remote
/// rejection carrying the collector's reason header, or an empty reason
/// when the header is missing.
pub fn classify(code: u16, reason: Option<String>) -> Result<Response> {
    if (200..300).contains(&code) {
        Ok(Response::from_http_code(code))
    } else {
        Err(DeliveryError::remote(code, reason.unwrap_or_default()))
    }
}

/// Reads the body to the end without buffering it.
async fn drain_body(mut response: reqwest::Response) {
    loop {
        match response.chunk().await {
            Ok(Some(_)) => {},
            Ok(None) => break,
            Err(e) => {
                // Status is already known; a broken body only loses the connection.
                debug!("failed to drain response body: {e}");
                break;
            },
        }
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "request timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };

    let mut description = format!("{kind}: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }
    description
}

fn build_client(options: &TransportOptions) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(options.timeout)
        .redirect(reqwest::redirect::Policy::none());

    if let Some(path) = &options.ca_cert_path {
        for certificate in load_trust_bundle(path)? {
            builder = builder.add_root_certificate(certificate);
        }
    }
    if let Some(proxy) = &options.http_proxy {
        builder = builder.proxy(reqwest::Proxy::http(proxy).map_err(|e| {
            DeliveryError::configuration(format!("invalid http proxy '{proxy}': {e}"))
        })?);
    }
    if let Some(proxy) = &options.https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy).map_err(|e| {
            DeliveryError::configuration(format!("invalid https proxy '{proxy}': {e}"))
        })?);
    }

    builder
        .build()
        .map_err(|e| DeliveryError::configuration(format!("failed to build HTTP client: {e}")))
}

fn load_trust_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>> {
    let pem = std::fs::read(path).map_err(|e| {
        DeliveryError::configuration(format!("cannot read trust bundle {}: {e}", path.display()))
    })?;
    let certificates = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
        DeliveryError::configuration(format!("invalid trust bundle {}: {e}", path.display()))
    })?;

    if certificates.is_empty() {
        return Err(DeliveryError::configuration(format!(
            "trust bundle {} contains no certificates",
            path.display()
        )));
    }
    Ok(certificates)
}

#[cfg(test)]
mod tests {
    use courier_core::{Destination, Status, Url};

    use super::*;

    fn options() -> TransportOptions {
        TransportOptions::new(Destination::new(
            Url::parse("http://127.0.0.1:9/api/1/store/").unwrap(),
            "public",
        ))
    }

    #[test]
    fn success_codes_resolve_through_status_lookup() {
        assert_eq!(classify(200, None).unwrap().status, Status::Success);
        assert_eq!(classify(202, Some("ignored".into())).unwrap().status, Status::Success);
    }

    #[test]
    fn non_success_codes_become_remote_errors() {
        assert_eq!(
            classify(429, Some("rate limited".into())),
            Err(DeliveryError::remote(429, "rate limited"))
        );
        assert_eq!(classify(500, None), Err(DeliveryError::remote(500, "")));
        assert_eq!(classify(302, None), Err(DeliveryError::remote(302, "")));
    }

    #[test]
    fn missing_trust_bundle_is_configuration_error() {
        let options = options().with_ca_cert_path("/nonexistent/courier/ca.pem");
        assert!(matches!(HttpTransport::new(options), Err(DeliveryError::Configuration { .. })));
    }

    #[test]
    fn supplied_client_is_reused() {
        let client = reqwest::Client::new();
        let options = options().with_client(client).with_ca_cert_path("/nonexistent/ca.pem");

        // The bundle is never read because the supplied client is used as-is.
        assert!(HttpTransport::new(options).is_ok());
    }
}
