//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//! - Keep index maintenance and cache invalidation on the write path.
//!
//! # Invariants
//! - Skill writes validate before persistence and reindex in the same
//!   transaction.
//! - Repository APIs return semantic errors (`NotFound`, `Duplicate`,
//!   `NotDeleted`) in addition to store errors.

use crate::db::DbError;
use crate::model::skill::SkillValidationError;
use crate::search::index::IndexError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod skill_repo;
pub mod tag_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(SkillValidationError),
    Db(DbError),
    /// Index maintenance failed; the enclosing write was rolled back.
    Index(IndexError),
    NotFound {
        entity: &'static str,
        id: i64,
    },
    /// A unique column already holds `value`.
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    /// Permanent deletion requires the record to be soft-deleted first.
    NotDeleted {
        entity: &'static str,
        id: i64,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Index(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Duplicate {
                entity,
                field,
                value,
            } => write!(f, "{entity} with {field} `{value}` already exists"),
            Self::NotDeleted { entity, id } => {
                write!(f, "{entity} {id} must be soft-deleted before permanent deletion")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Index(err) => Some(err),
            Self::NotFound { .. }
            | Self::Duplicate { .. }
            | Self::NotDeleted { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<SkillValidationError> for RepoError {
    fn from(value: SkillValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<IndexError> for RepoError {
    fn from(value: IndexError) -> Self {
        Self::Index(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Maps a unique-constraint failure on `entity` to `RepoError::Duplicate`.
///
/// `fields` lists `(column, value)` pairs; the column named in the SQLite
/// message wins, the first pair is the fallback.
pub(crate) fn map_unique_violation(
    err: rusqlite::Error,
    entity: &'static str,
    fields: &[(&'static str, &str)],
) -> RepoError {
    let db_error = DbError::Sqlite(err);
    if !db_error.is_unique_violation() {
        return RepoError::Db(db_error);
    }

    let message = db_error.to_string();
    let (field, value) = fields
        .iter()
        .find(|(column, _)| message.contains(&format!(".{column}")))
        .or_else(|| fields.first())
        .map_or(("id", ""), |(column, value)| (*column, *value));

    RepoError::Duplicate {
        entity,
        field,
        value: value.to_string(),
    }
}
