//! Event and destination fixtures.

use std::net::TcpListener;

use courier_core::{Destination, Event, Url};
use serde_json::{json, Map, Value};

/// Builder for test events.
#[derive(Debug, Clone, Default)]
pub struct EventBuilder {
    fields: Map<String, Value>,
}

impl EventBuilder {
    /// Starts an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event message.
    #[must_use]
    pub fn message(self, message: &str) -> Self {
        self.field("message", json!(message))
    }

    /// Sets the event level.
    #[must_use]
    pub fn level(self, level: &str) -> Self {
        self.field("level", json!(level))
    }

    /// Sets an arbitrary top-level field.
    #[must_use]
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Builds the event.
    pub fn build(self) -> Event {
        Event::new(Value::Object(self.fields))
    }
}

/// A small error event.
pub fn sample_event() -> Event {
    EventBuilder::new().message("something broke").level("error").build()
}

/// Destination on a local port nothing listens on.
///
/// Connections to it are refused, which exercises transport-level failures.
pub fn unreachable_destination() -> Destination {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
        listener.local_addr().expect("listener has a local address").port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{port}/api/1/store/"))
        .expect("loopback URL is valid");
    Destination::new(url, "unreachable")
}
