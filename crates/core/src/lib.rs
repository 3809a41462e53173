//! Hardware-independent domain logic for the compost monitor.
//!
//! Holds the reading and alert types shared by every other crate, the
//! diagnostic rule engine, and the composting care recommendations.
//! Nothing in this crate performs I/O.

pub mod alert;
pub mod diagnostics;
pub mod reading;
pub mod recommendation;
pub mod types;
