//! Admission-controlled buffer of in-flight deliveries.
//!
//! The buffer enforces a hard ceiling on concurrently outstanding deliveries
//! and lets shutdown code wait for outstanding work with a timeout.
//!
//! # Slot lifecycle
//!
//! ```text
//! try_admit ──▶ outstanding < capacity? ──no──▶ BufferFull (task dropped unpolled)
//!                    │
//!                   yes: take ticket N, spawn(task + SlotGuard(N))
//!                    │
//!                    ▼
//!           task settles / panics / is dropped
//!                    │
//!                    ▼
//!         SlotGuard::drop: retire N ──▶ output published to DeliveryHandle
//! ```
//!
//! Outstanding tickets live in a `tokio::sync::watch` channel. Admission
//! takes the next ticket under the channel's lock, release retires it under
//! the same lock, and the in-flight count is the number of outstanding
//! tickets. `drain` records the next ticket at the moment it is called and
//! waits until no older ticket is outstanding, so deliveries admitted
//! afterwards never hold it up. The slot is released before the task's
//! output becomes visible through its handle, so a caller that has observed
//! an outcome never sees that delivery still counted against capacity.

use std::{
    collections::BTreeSet,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use courier_core::{DeliveryError, Response, Result};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

/// Bounded set of in-flight deliveries.
#[derive(Debug)]
pub struct DeliveryBuffer {
    capacity: usize,
    slots: Arc<watch::Sender<Slots>>,
}

/// Tickets of admitted deliveries that have not settled yet.
#[derive(Debug, Default)]
struct Slots {
    next_ticket: u64,
    outstanding: BTreeSet<u64>,
}

impl Slots {
    /// True when every delivery admitted before `horizon` has settled.
    fn settled_before(&self, horizon: u64) -> bool {
        self.outstanding.first().map_or(true, |oldest| *oldest >= horizon)
    }
}

impl DeliveryBuffer {
    /// Creates a buffer admitting at most `capacity` concurrent deliveries.
    ///
    /// A zero capacity rejects every admission.
    pub fn new(capacity: usize) -> Self {
        let (slots, _) = watch::channel(Slots::default());
        Self { capacity, slots: Arc::new(slots) }
    }

    /// Maximum number of concurrent deliveries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of deliveries admitted and not yet settled.
    pub fn in_flight(&self) -> usize {
        self.slots.borrow().outstanding.len()
    }

    /// True when no delivery is outstanding.
    pub fn is_empty(&self) -> bool {
        self.in_flight() == 0
    }

    /// Admits `task` if a slot is free and starts it in the background.
    ///
    /// The task is only polled after admission; on rejection it is dropped
    /// without ever running. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::BufferFull` when `capacity` deliveries are
    /// already in flight.
    pub fn try_admit<F>(&self, task: F) -> Result<DeliveryHandle>
    where
        F: Future<Output = Result<Response>> + Send + 'static,
    {
        let Some(slot) = self.try_acquire_slot() else {
            debug!(capacity = self.capacity, "delivery rejected, buffer full");
            return Err(DeliveryError::buffer_full(self.capacity));
        };

        let task = tokio::spawn(async move {
            let _slot = slot;
            task.await
        });

        Ok(DeliveryHandle { task })
    }

    /// Waits for the deliveries in flight at the time of the call to settle.
    ///
    /// The set of deliveries to wait for is fixed when `drain` is called,
    /// before the returned future is first polled. Returns `true` once all of
    /// them have settled, or `false` if `timeout` elapses first. `None` waits
    /// indefinitely. Admissions made while draining are neither blocked nor
    /// waited for. Timing out does not abort anything still in flight.
    pub fn drain(&self, timeout: Option<Duration>) -> impl Future<Output = bool> + Send + 'static {
        let mut slots = self.slots.subscribe();
        let horizon = slots.borrow().next_ticket;

        async move {
            let settled =
                async move { slots.wait_for(|slots| slots.settled_before(horizon)).await.is_ok() };

            match timeout {
                Some(limit) => tokio::time::timeout(limit, settled).await.unwrap_or(false),
                None => settled.await,
            }
        }
    }

    fn try_acquire_slot(&self) -> Option<SlotGuard> {
        let capacity = self.capacity;
        let mut ticket = None;
        self.slots.send_if_modified(|slots| {
            if slots.outstanding.len() < capacity {
                let issued = slots.next_ticket;
                slots.next_ticket += 1;
                slots.outstanding.insert(issued);
                ticket = Some(issued);
                true
            } else {
                false
            }
        });

        ticket.map(|ticket| SlotGuard { slots: Arc::clone(&self.slots), ticket })
    }
}

/// Capacity slot held by one admitted delivery.
#[derive(Debug)]
struct SlotGuard {
    slots: Arc<watch::Sender<Slots>>,
    ticket: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.send_modify(|slots| {
            let retired = slots.outstanding.remove(&self.ticket);
            debug_assert!(retired, "slot released twice");
        });
    }
}

/// Handle to an admitted delivery.
///
/// Resolves to the delivery's outcome. Dropping the handle does not cancel
/// the delivery; it still runs to completion and releases its slot.
#[derive(Debug)]
pub struct DeliveryHandle {
    task: JoinHandle<Result<Response>>,
}

impl Future for DeliveryHandle {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(join_error) => Err(DeliveryError::task_failed(join_error.to_string())),
        })
    }
}
