//! Domain models for event delivery.
//!
//! Events are opaque to the delivery pipeline: it serializes them as the
//! request body and never looks inside. Responses carry only the collector
//! status derived from the HTTP reply.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Protocol version advertised in the collector auth header.
pub const PROTOCOL_VERSION: u8 = 7;

/// An already-serialized event to be transmitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    id: Uuid,
    payload: Value,
}

impl Event {
    /// Wraps a payload, taking its `event_id` field when it holds a UUID.
    pub fn new(payload: Value) -> Self {
        let id = payload
            .get("event_id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .unwrap_or_else(Uuid::new_v4);

        Self { id, payload }
    }

    /// Identifier used to correlate logs for this event.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The payload that becomes the request body.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// JSON encoding of the payload.
    pub fn to_json(&self) -> String {
        self.payload.to_string()
    }
}

/// Collector verdict for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The event was accepted.
    Success,
    /// The collector is throttling this client.
    RateLimited,
    /// The collector refused the payload.
    Invalid,
    /// The collector failed while processing the payload.
    Failed,
    /// The status code is informational or a redirect.
    Unknown,
}

impl Status {
    /// Maps an HTTP status code to a collector status.
    pub fn from_http_code(code: u16) -> Self {
        match code {
            200..=299 => Self::Success,
            429 => Self::RateLimited,
            400..=499 => Self::Invalid,
            500.. => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Invalid => write!(f, "invalid"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of a successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Status derived from the HTTP reply.
    pub status: Status,
}

impl Response {
    /// Builds a response from the collector's HTTP status code.
    pub fn from_http_code(code: u16) -> Self {
        Self { status: Status::from_http_code(code) }
    }
}

/// Where events go and how the collector authenticates them.
///
/// Comes pre-parsed from configuration; the delivery pipeline only reads it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Full URL of the collector's event store endpoint.
    pub store_url: Url,
    /// Public key identifying the project to the collector.
    pub public_key: String,
    /// Legacy secret key, sent only when configured.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Destination {
    /// Creates a destination without a secret key.
    pub fn new(store_url: Url, public_key: impl Into<String>) -> Self {
        Self { store_url, public_key: public_key.into(), secret_key: None }
    }

    /// Adds a secret key.
    #[must_use]
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Value of the collector auth header for the given client identifier.
    pub fn auth_header(&self, client: &str) -> String {
        let mut header = format!(
            "Sentry sentry_version={PROTOCOL_VERSION}, sentry_client={client}, sentry_key={}",
            self.public_key
        );
        if let Some(secret) = &self.secret_key {
            header.push_str(", sentry_secret=");
            header.push_str(secret);
        }
        header
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("store_url", &self.store_url.as_str())
            .field("public_key", &self.public_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn destination() -> Destination {
        Destination::new(
            Url::parse("https://collector.example.com/api/42/store/").unwrap(),
            "public",
        )
    }

    #[test]
    fn status_lookup_covers_code_classes() {
        assert_eq!(Status::from_http_code(200), Status::Success);
        assert_eq!(Status::from_http_code(204), Status::Success);
        assert_eq!(Status::from_http_code(429), Status::RateLimited);
        assert_eq!(Status::from_http_code(413), Status::Invalid);
        assert_eq!(Status::from_http_code(502), Status::Failed);
        assert_eq!(Status::from_http_code(600), Status::Failed);
        assert_eq!(Status::from_http_code(999), Status::Failed);
        assert_eq!(Status::from_http_code(302), Status::Unknown);
        assert_eq!(Status::from_http_code(100), Status::Unknown);
    }

    #[test]
    fn event_reuses_payload_event_id() {
        let id = Uuid::new_v4();
        let event = Event::new(json!({ "event_id": id.to_string(), "message": "boom" }));
        assert_eq!(event.id(), id);

        let anonymous = Event::new(json!({ "event_id": "not-a-uuid" }));
        assert_ne!(anonymous.id(), Uuid::nil());
    }

    #[test]
    fn event_body_is_payload_json() {
        let event = Event::new(json!({ "level": "error" }));
        assert_eq!(event.to_json(), r#"{"level":"error"}"#);
    }

    #[test]
    fn auth_header_includes_secret_only_when_configured() {
        let header = destination().auth_header("courier/0.1.0");
        assert_eq!(
            header,
            "Sentry sentry_version=7, sentry_client=courier/0.1.0, sentry_key=public"
        );

        let header = destination().with_secret_key("hush").auth_header("courier/0.1.0");
        assert!(header.ends_with(", sentry_secret=hush"));
    }

    #[test]
    fn debug_output_masks_secret() {
        let rendered = format!("{:?}", destination().with_secret_key("hush"));
        assert!(!rendered.contains("hush"));
        assert!(rendered.contains("***"));
    }
}
