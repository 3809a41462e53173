//! Sensor hub client and live acquisition loop.
//!
//! Provides typed parsing of the hub's JSON payloads, an HTTP client for
//! the hub's REST endpoints, the [`source::ReadingSource`] seam the loop
//! polls through, and the [`poller::AcquisitionLoop`] itself.

pub mod api;
pub mod messages;
pub mod poller;
pub mod source;
