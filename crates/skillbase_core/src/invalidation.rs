//! Index and cache coherency policy for store mutations.
//!
//! # Responsibility
//! - Map every mutation to the index action run inside its transaction and
//!   the cache action run after it commits.
//! - Apply cache actions against the explicitly injected caches.
//!
//! # Invariants
//! - Search is never cached, so skill mutations clear no cache entries.
//! - Soft delete and restore leave index rows untouched.
//! - Cache actions run only after the store write committed; a failed write
//!   leaves caches as they were.

use crate::cache::{keys, ProjectCache, TagCache};
use crate::model::skill::SkillId;
use crate::search::index::{purge_index, IndexResult};
use log::debug;
use rusqlite::Transaction;
use std::sync::Arc;

/// Store mutation relevant to index or cache coherency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    SkillCreated(SkillId),
    SkillUpdated(SkillId),
    SkillSoftDeleted(SkillId),
    SkillRestored(SkillId),
    SkillDestroyed(SkillId),
    /// Create, update, soft delete, restore or destroy of a job task.
    TaskChanged,
    /// Create, update or delete of a tag.
    TagChanged,
}

/// Work on the term index required by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAction {
    None,
    /// Replace the skill's rows from its current name and description.
    Rebuild(SkillId),
    /// Drop all of the skill's rows.
    Purge(SkillId),
}

/// Cache entries to drop after a mutation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    None,
    /// The cached distinct project list.
    ProjectList,
    /// Every key under the tag namespace: by-id, pages and total.
    TagNamespace,
}

impl Mutation {
    pub fn index_action(self) -> IndexAction {
        match self {
            Self::SkillCreated(id) | Self::SkillUpdated(id) => IndexAction::Rebuild(id),
            Self::SkillDestroyed(id) => IndexAction::Purge(id),
            Self::SkillSoftDeleted(_)
            | Self::SkillRestored(_)
            | Self::TaskChanged
            | Self::TagChanged => IndexAction::None,
        }
    }

    pub fn cache_action(self) -> CacheAction {
        match self {
            Self::TaskChanged => CacheAction::ProjectList,
            Self::TagChanged => CacheAction::TagNamespace,
            Self::SkillCreated(_)
            | Self::SkillUpdated(_)
            | Self::SkillSoftDeleted(_)
            | Self::SkillRestored(_)
            | Self::SkillDestroyed(_) => CacheAction::None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::SkillCreated(_) => "skill_created",
            Self::SkillUpdated(_) => "skill_updated",
            Self::SkillSoftDeleted(_) => "skill_soft_deleted",
            Self::SkillRestored(_) => "skill_restored",
            Self::SkillDestroyed(_) => "skill_destroyed",
            Self::TaskChanged => "task_changed",
            Self::TagChanged => "tag_changed",
        }
    }
}

/// Runs the purge half of the index policy inside `tx`.
///
/// Rebuilds need the skill text and go through
/// [`crate::search::index::apply_and_reindex`] instead; for them and for
/// `IndexAction::None` this is a no-op returning `0`.
pub fn apply_purge(tx: &Transaction<'_>, mutation: Mutation) -> IndexResult<usize> {
    match mutation.index_action() {
        IndexAction::Purge(skill_id) => purge_index(tx, skill_id),
        IndexAction::Rebuild(_) | IndexAction::None => Ok(0),
    }
}

/// Clears cache entries made stale by committed mutations.
#[derive(Debug, Clone)]
pub struct Invalidator {
    tags: Arc<TagCache>,
    projects: Arc<ProjectCache>,
}

impl Invalidator {
    pub fn new(tags: Arc<TagCache>, projects: Arc<ProjectCache>) -> Self {
        Self { tags, projects }
    }

    pub fn tag_cache(&self) -> &TagCache {
        &self.tags
    }

    pub fn project_cache(&self) -> &ProjectCache {
        &self.projects
    }

    /// Applies the cache action of `mutation`. Returns removed entry count.
    pub fn after_commit(&self, mutation: Mutation) -> usize {
        let removed = match mutation.cache_action() {
            CacheAction::None => return 0,
            CacheAction::ProjectList => usize::from(self.projects.delete(keys::PROJECT_LIST)),
            CacheAction::TagNamespace => self.tags.delete_by_prefix(keys::TAG_NAMESPACE),
        };
        debug!(
            "event=cache_invalidate module=invalidation status=ok mutation={} removed={}",
            mutation.as_str(),
            removed
        );
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheAction, IndexAction, Invalidator, Mutation};
    use crate::cache::{keys, ProjectCache, TagCache, TagCacheValue};
    use std::sync::Arc;
    use std::time::Duration;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn policy_table_matches_mutation_kinds() {
        let table = [
            (Mutation::SkillCreated(1), IndexAction::Rebuild(1), CacheAction::None),
            (Mutation::SkillUpdated(1), IndexAction::Rebuild(1), CacheAction::None),
            (Mutation::SkillSoftDeleted(1), IndexAction::None, CacheAction::None),
            (Mutation::SkillRestored(1), IndexAction::None, CacheAction::None),
            (Mutation::SkillDestroyed(1), IndexAction::Purge(1), CacheAction::None),
            (Mutation::TaskChanged, IndexAction::None, CacheAction::ProjectList),
            (Mutation::TagChanged, IndexAction::None, CacheAction::TagNamespace),
        ];
        for (mutation, index, cache) in table {
            assert_eq!(mutation.index_action(), index, "{mutation:?}");
            assert_eq!(mutation.cache_action(), cache, "{mutation:?}");
        }
    }

    #[test]
    fn tag_change_clears_only_tag_namespace() {
        let tags = Arc::new(TagCache::new(0));
        let projects = Arc::new(ProjectCache::new(0));
        tags.set(keys::tag(1), TagCacheValue::Total(1), TTL);
        tags.set(keys::TAG_TOTAL, TagCacheValue::Total(3), TTL);
        projects.set(keys::PROJECT_LIST, vec!["alpha".to_string()], TTL);

        let invalidator = Invalidator::new(Arc::clone(&tags), Arc::clone(&projects));
        assert_eq!(invalidator.after_commit(Mutation::TagChanged), 2);
        assert!(tags.is_empty());
        assert_eq!(projects.len(), 1);
    }

    #[test]
    fn skill_mutations_leave_caches_alone() {
        let tags = Arc::new(TagCache::new(0));
        let projects = Arc::new(ProjectCache::new(0));
        tags.set(keys::TAG_TOTAL, TagCacheValue::Total(3), TTL);
        projects.set(keys::PROJECT_LIST, Vec::new(), TTL);

        let invalidator = Invalidator::new(Arc::clone(&tags), Arc::clone(&projects));
        assert_eq!(invalidator.after_commit(Mutation::SkillDestroyed(9)), 0);
        assert_eq!(tags.len(), 1);
        assert_eq!(projects.len(), 1);
    }
}
