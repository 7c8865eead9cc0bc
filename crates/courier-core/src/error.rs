//! Error types for event delivery operations.
//!
//! Every failure a delivery can end in is a variant of [`DeliveryError`].
//! Failures are returned to whoever called `send`; nothing in the delivery
//! pipeline retries or swallows them.

use std::fmt;

use thiserror::Error;

use crate::models::Status;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Error taxonomy for a single delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The in-flight buffer is at capacity. No network I/O was attempted.
    #[error("delivery buffer full: {capacity} deliveries already in flight")]
    BufferFull {
        /// Capacity of the buffer that rejected the delivery
        capacity: usize,
    },

    /// The collector answered with a non-2xx status.
    #[error("collector rejected event: HTTP {}{}", .code, reason_suffix(.reason))]
    RemoteError {
        /// HTTP status code returned by the collector
        code: u16,
        /// Value of the collector's error-reason header, empty when absent
        reason: String,
    },

    /// The exchange failed before any response was received.
    #[error("transport failure: {cause}")]
    TransportError {
        /// Description of the underlying connection, TLS or timeout failure
        cause: String,
    },

    /// The transport has no network behavior of its own.
    #[error("send is not implemented by this transport")]
    NotImplemented,

    /// The transport could not be constructed from its options.
    #[error("invalid transport configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },

    /// The delivery task panicked or was aborted before settling.
    #[error("delivery task failed: {message}")]
    TaskFailed {
        /// Join error reported by the runtime
        message: String,
    },
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(" ({reason})")
    }
}

impl DeliveryError {
    /// Creates a buffer-full rejection.
    pub fn buffer_full(capacity: usize) -> Self {
        Self::BufferFull { capacity }
    }

    /// Creates a remote rejection from a status code and reason header.
    pub fn remote(code: u16, reason: impl Into<String>) -> Self {
        Self::RemoteError { code, reason: reason.into() }
    }

    /// Creates a transport-level failure.
    pub fn transport(cause: impl Into<String>) -> Self {
        Self::TransportError { cause: cause.into() }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a task failure.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed { message: message.into() }
    }

    /// Returns the collector status for remote rejections.
    ///
    /// Lets callers tell a rate limit apart from an invalid payload without
    /// matching on raw status codes.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::RemoteError { code, .. } => Some(Status::from_http_code(*code)),
            _ => None,
        }
    }

    /// True when the delivery never reached the network.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::BufferFull { .. } | Self::NotImplemented | Self::Configuration { .. })
    }
}

/// Category of delivery error for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Local admission control.
    Admission,
    /// Collector rejection.
    Remote,
    /// Network or TLS failure.
    Network,
    /// Integration or configuration mistakes.
    Configuration,
    /// Runtime failures of the delivery task.
    Internal,
}

impl From<&DeliveryError> for ErrorCategory {
    fn from(error: &DeliveryError) -> Self {
        match error {
            DeliveryError::BufferFull { .. } => Self::Admission,
            DeliveryError::RemoteError { .. } => Self::Remote,
            DeliveryError::TransportError { .. } => Self::Network,
            DeliveryError::NotImplemented | DeliveryError::Configuration { .. } => {
                Self::Configuration
            },
            DeliveryError::TaskFailed { .. } => Self::Internal,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admission => write!(f, "admission"),
            Self::Remote => write!(f, "remote"),
            Self::Network => write!(f, "network"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
