//! Domain model for skills, tags and job tasks.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Express soft deletion as an explicit lifecycle state.
//!
//! # Invariants
//! - Every record is identified by a store-assigned integer id.
//! - Deletion is a `Lifecycle::Deleted` tombstone until permanent destroy.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod lifecycle;
pub mod skill;
pub mod tag;
pub mod task;

/// Returns the current wall-clock time in Unix epoch milliseconds.
///
/// Clocks set before the epoch yield `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}
