//! Tag domain model.

use serde::{Deserialize, Serialize};

pub type TagId = i64;

/// Label grouping skills; names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One page of tags plus the total row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPage {
    pub items: Vec<Tag>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl TagPage {
    /// Number of pages needed for `total` rows at `page_size`.
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}
