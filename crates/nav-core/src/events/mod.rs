//! Event System
//!
//! Queueing and JSONL logging of the broadcasts agents emit.

pub mod logger;

pub use logger::{EventLogger, PendingEvents};
