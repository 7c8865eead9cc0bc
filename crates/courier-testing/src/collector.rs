//! Mock collector for delivery tests.

use std::time::Duration;

use courier_core::{Destination, Url};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

/// Path the mock collector accepts events on.
const STORE_PATH: &str = "/api/1/store/";

/// Public key the mock collector's destination authenticates with.
const PUBLIC_KEY: &str = "test-public-key";

/// How the mock collector answers event submissions.
#[derive(Debug, Clone)]
pub enum CollectorResponse {
    /// Respond with the given 2xx status.
    Accepted {
        /// HTTP status code
        status: u16,
    },
    /// Respond with a non-2xx status and an optional reason header.
    Rejected {
        /// HTTP status code
        status: u16,
        /// Value for the `x-sentry-error` header
        reason: Option<String>,
    },
    /// Respond with `status` after waiting `delay`.
    Delayed {
        /// HTTP status code
        status: u16,
        /// Time before the response is sent
        delay: Duration,
    },
}

impl CollectorResponse {
    /// A plain 200 OK.
    pub fn ok() -> Self {
        Self::Accepted { status: 200 }
    }

    /// A rejection carrying a reason header.
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self::Rejected { status, reason: Some(reason.into()) }
    }

    fn template(&self) -> ResponseTemplate {
        match self {
            Self::Accepted { status } => {
                ResponseTemplate::new(*status).set_body_string(r#"{"id":"accepted"}"#)
            },
            Self::Rejected { status, reason } => {
                let mut response = ResponseTemplate::new(*status).set_body_string("rejected");
                if let Some(reason) = reason {
                    response = response.insert_header("x-sentry-error", reason.as_str());
                }
                response
            },
            Self::Delayed { status, delay } => ResponseTemplate::new(*status).set_delay(*delay),
        }
    }
}

/// HTTP collector double listening on a random local port.
pub struct MockCollector {
    server: MockServer,
}

impl MockCollector {
    /// Starts a collector with no responses mounted.
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// URL events should be posted to.
    pub fn store_url(&self) -> Url {
        Url::parse(&format!("{}{STORE_PATH}", self.server.uri()))
            .expect("mock server URI is a valid URL")
    }

    /// Destination pointing at this collector.
    pub fn destination(&self) -> Destination {
        Destination::new(self.store_url(), PUBLIC_KEY)
    }

    /// Answers every event submission with `response`.
    pub async fn respond_with(&self, response: CollectorResponse) {
        Mock::given(method("POST"))
            .and(path(STORE_PATH))
            .respond_with(response.template())
            .mount(&self.server)
            .await;
    }

    /// Answers with `response` and verifies on drop that exactly
    /// `expected_calls` submissions arrived.
    pub async fn expect(&self, response: CollectorResponse, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(STORE_PATH))
            .respond_with(response.template())
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    /// Requests received so far.
    pub async fn received_requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of event submissions received so far.
    pub async fn received_count(&self) -> usize {
        self.received_requests().await.len()
    }
}
