//! The transport contract and its shared behavior.
//!
//! [`Transport`] has one required operation, [`Transport::send`]. Closing is
//! provided on top of the buffer every transport owns. [`BaseTransport`]
//! carries the validated request template and buffer that concrete
//! transports compose; used on its own it has no network behavior.

use std::{future::Future, sync::Arc, time::Duration};

use courier_core::{DeliveryError, Event, Result};
use tracing::debug;

use crate::{
    buffer::{DeliveryBuffer, DeliveryHandle},
    options::TransportOptions,
    request::{RequestParams, RequestTemplate},
};

/// Delivers events to a collector under admission control.
pub trait Transport: Send + Sync {
    /// Starts delivering `event` and returns a handle to its outcome.
    ///
    /// Returns without waiting for network I/O.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::BufferFull` when the delivery was not admitted,
    /// or `DeliveryError::NotImplemented` for transports without network
    /// behavior.
    fn send(&self, event: Event) -> Result<DeliveryHandle>;

    /// Buffer tracking this transport's in-flight deliveries.
    fn buffer(&self) -> &DeliveryBuffer;

    /// Waits up to `timeout` for the deliveries in flight when `close` is
    /// called to settle.
    ///
    /// Returns `true` when they all settled in time. Sends made after the call
    /// are not waited for. Never aborts a delivery.
    fn close(&self, timeout: Option<Duration>) -> impl Future<Output = bool> + Send {
        self.buffer().drain(timeout)
    }
}

/// Shared state of every transport.
#[derive(Debug, Clone)]
pub struct BaseTransport {
    template: Arc<RequestTemplate>,
    buffer: Arc<DeliveryBuffer>,
}

impl BaseTransport {
    /// Validates `options` and creates the delivery buffer.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` when the destination or headers
    /// are invalid.
    pub fn new(options: TransportOptions) -> Result<Self> {
        let template = RequestTemplate::from_options(&options)?;
        let buffer = DeliveryBuffer::new(options.buffer_capacity);

        debug!(
            destination = %options.destination.store_url,
            capacity = options.buffer_capacity,
            "transport configured"
        );

        Ok(Self { template: Arc::new(template), buffer: Arc::new(buffer) })
    }

    /// Builds the HTTP request parameters for `event`.
    pub fn build_request(&self, event: &Event) -> RequestParams {
        self.template.build(event)
    }
}

impl Transport for BaseTransport {
    fn send(&self, _event: Event) -> Result<DeliveryHandle> {
        Err(DeliveryError::NotImplemented)
    }

    fn buffer(&self) -> &DeliveryBuffer {
        &self.buffer
    }
}
