//! Core of the skill knowledge base: storage, keyword search over skills,
//! and the read-through caches that back tag and project listings.
//! This crate is the single source of truth for index and cache coherency.

pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod invalidation;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use app::{AppError, AppResult, SkillBase};
pub use cache::{LocalCache, ProjectCache, TagCache, TagCacheValue};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use invalidation::{CacheAction, IndexAction, Invalidator, Mutation};
pub use logging::{
    default_log_level, init_logging, logging_status, LogSettings, LoggingError, LoggingStatus,
};
pub use model::lifecycle::Lifecycle;
pub use model::skill::{NewSkill, Skill, SkillId, SkillValidationError};
pub use model::tag::{Tag, TagId, TagPage};
pub use model::task::{JobTask, NewJobTask, TaskId, TaskKind, TaskStatus};
pub use repo::skill_repo::{SkillListQuery, SkillRepository, SkillScope, SqliteSkillRepository};
pub use repo::tag_repo::{SqliteTagRepository, TagRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskListQuery, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use search::index::{IndexError, IndexFailure, IndexOp};
pub use search::ranker::{search_skills, SearchError, SearchResult, SkillMatch};
pub use search::tokenizer::{DictionarySource, Tokenizer, TokenizerError};
pub use service::skill_service::{SkillService, SkillServiceError};
pub use service::tag_service::{TagService, TagServiceError};
pub use service::task_service::{TaskService, TaskServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
