//! Shared value types and the controller-owned session context.
//!
//! - [`types`]: modes, motor/LED flags, songs, schedules, statistics
//! - [`session::Session`]: transport handle, counters and last result code

pub mod session;
pub mod types;
