//! Test infrastructure for courier delivery tests.
//!
//! Provides a wiremock-backed collector and event fixtures so transport
//! tests can exercise real HTTP exchanges without external services.

#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::expect_used)] // test setup failures should abort the test

pub mod collector;
pub mod fixtures;

pub use collector::{CollectorResponse, MockCollector};
pub use fixtures::{sample_event, unreachable_destination, EventBuilder};
