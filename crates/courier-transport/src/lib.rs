//! Admission-controlled event delivery over HTTP.
//!
//! This crate implements the delivery pipeline that turns each event into
//! exactly one HTTP exchange with a remote collector, while never letting
//! more than a fixed number of exchanges be in flight.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐  send   ┌────────────────┐  try_admit  ┌────────────────┐
//! │  caller   │────────▶│ HttpTransport  │────────────▶│ DeliveryBuffer │
//! └───────────┘         └────────────────┘             └────────────────┘
//!       ▲                      │ build request               │ spawn
//!       │                      ▼                             ▼
//!       │               ┌────────────────┐          ┌────────────────┐
//!       └───────────────│ DeliveryHandle │◀─────────│  HTTP exchange │
//!         Response /    └────────────────┘  settle  └────────────────┘
//!         DeliveryError                     + release slot
//! ```
//!
//! 1. **Build** - headers, destination and JSON body come from the options
//! 2. **Admit** - the buffer rejects with `BufferFull` when at capacity
//! 3. **Exchange** - one POST, body drained on every branch
//! 4. **Settle** - the slot is released, then the handle resolves
//!
//! Nothing is retried here. Callers decide what to do with a failure.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use courier_core::{Destination, Event, Url};
//! use courier_transport::{HttpTransport, Transport, TransportOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let destination =
//!     Destination::new(Url::parse("https://collector.example.com/api/1/store/")?, "public-key");
//! let transport = HttpTransport::new(TransportOptions::new(destination))?;
//!
//! let handle = transport.send(Event::new(serde_json::json!({ "message": "disk full" })))?;
//! let response = handle.await?;
//! println!("collector answered {}", response.status);
//!
//! transport.close(Some(Duration::from_secs(2))).await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod http;
pub mod options;
pub mod request;
pub mod transport;

pub use buffer::{DeliveryBuffer, DeliveryHandle};
pub use http::HttpTransport;
pub use options::TransportOptions;
pub use request::{RequestParams, RequestTemplate};
pub use transport::{BaseTransport, Transport};

/// Default number of deliveries allowed in flight at once.
pub const DEFAULT_BUFFER_CAPACITY: usize = 30;

/// Default HTTP exchange timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
