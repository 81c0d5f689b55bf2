//! Soft-delete lifecycle shared by skills and job tasks.
//!
//! The store keeps a nullable `deleted_at` column; `NULL` is the only live
//! marker, so an epoch-zero deletion timestamp stays a deletion.

use serde::{Deserialize, Serialize};

/// Visibility state of a soft-deletable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    /// Visible to normal reads and search.
    Active,
    /// In the recycle bin since `at_ms` (Unix epoch milliseconds).
    Deleted { at_ms: i64 },
}

impl Lifecycle {
    /// Maps the nullable `deleted_at` column to a lifecycle state.
    pub fn from_deleted_at(deleted_at: Option<i64>) -> Self {
        match deleted_at {
            Some(at_ms) => Self::Deleted { at_ms },
            None => Self::Active,
        }
    }

    /// Returns the value stored in the `deleted_at` column.
    pub fn deleted_at(self) -> Option<i64> {
        match self {
            Self::Active => None,
            Self::Deleted { at_ms } => Some(at_ms),
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}
