//! Read-through caches for aggregate reads.
//!
//! # Responsibility
//! - Provide the generic TTL cache (`LocalCache`).
//! - Own the key naming convention that prefix invalidation relies on.
//!
//! # Invariants
//! - Every tag-derived key starts with [`keys::TAG_NAMESPACE`].
//! - Caches are explicit dependencies; there is no shared default instance.

mod local_cache;

pub use local_cache::LocalCache;

use crate::model::tag::Tag;

/// Values held by the tag cache namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCacheValue {
    Tag(Tag),
    Page(Vec<Tag>),
    Total(u64),
}

/// Cache for tag detail, tag pages and the tag total.
pub type TagCache = LocalCache<TagCacheValue>;

/// Cache for the distinct project list of live job tasks.
pub type ProjectCache = LocalCache<Vec<String>>;

/// Cache key builders.
pub mod keys {
    use crate::model::tag::TagId;

    /// Prefix shared by every tag key.
    pub const TAG_NAMESPACE: &str = "tag:";
    pub const TAG_TOTAL: &str = "tag:total";
    pub const PROJECT_LIST: &str = "jobtasks:projects:all";

    pub fn tag(id: TagId) -> String {
        format!("{TAG_NAMESPACE}{id}")
    }

    pub fn tag_list(page: u32, page_size: u32) -> String {
        format!("{TAG_NAMESPACE}list:{page}:{page_size}")
    }

    #[cfg(test)]
    mod tests {
        use super::{tag, tag_list, TAG_NAMESPACE, TAG_TOTAL};

        #[test]
        fn tag_keys_share_the_namespace_prefix() {
            for key in [tag(7), tag_list(1, 10), TAG_TOTAL.to_string()] {
                assert!(key.starts_with(TAG_NAMESPACE), "{key}");
            }
            assert_eq!(tag(7), "tag:7");
            assert_eq!(tag_list(2, 20), "tag:list:2:20");
        }
    }
}
