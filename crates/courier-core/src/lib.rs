//! Core domain types for courier event delivery.
//!
//! Provides the event, response and destination models plus the error
//! taxonomy shared by the transport and the service binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;

pub use error::{DeliveryError, ErrorCategory, Result};
pub use models::{Destination, Event, Response, Status, PROTOCOL_VERSION};
pub use url::Url;
