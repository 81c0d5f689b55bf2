//! Skill use-case service.
//!
//! # Responsibility
//! - Provide skill create/update/lifecycle/search entry points for callers.
//! - Translate repository failures into caller-facing errors.
//!
//! # Invariants
//! - Names are checked for duplicates before the write; the unique index
//!   still guards against races.
//! - Search never degrades into a partial list: a failure is
//!   `SearchUnavailable`.

use crate::model::skill::{NewSkill, Skill, SkillId, SkillValidationError};
use crate::repo::skill_repo::{normalize_skill_limit, SkillListQuery, SkillRepository, SkillScope};
use crate::repo::RepoError;
use crate::search::ranker::{SearchError, SkillMatch};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default cap for ranked results handed to agent-facing callers.
pub const SEARCH_RESULT_LIMIT: usize = 20;

/// Service error for skill use-cases.
#[derive(Debug)]
pub enum SkillServiceError {
    Validation(SkillValidationError),
    SkillNotFound(SkillId),
    DuplicateName(String),
    DuplicateResourceDir(String),
    /// Permanent deletion of a skill that is still live.
    NotDeleted(SkillId),
    SearchUnavailable(SearchError),
    Repo(RepoError),
    /// Write succeeded but the read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for SkillServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::SkillNotFound(id) => write!(f, "skill not found: {id}"),
            Self::DuplicateName(name) => write!(f, "skill name already exists: `{name}`"),
            Self::DuplicateResourceDir(dir) => {
                write!(f, "skill resource_dir already exists: `{dir}`")
            }
            Self::NotDeleted(id) => write!(f, "skill {id} is not in the recycle bin"),
            Self::SearchUnavailable(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent skill state: {details}"),
        }
    }
}

impl Error for SkillServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::SearchUnavailable(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SkillServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity: "skill", id } => Self::SkillNotFound(id),
            RepoError::NotDeleted { entity: "skill", id } => Self::NotDeleted(id),
            RepoError::Duplicate {
                entity: "skill",
                field: "resource_dir",
                value,
            } => Self::DuplicateResourceDir(value),
            RepoError::Duplicate {
                entity: "skill",
                value,
                ..
            } => Self::DuplicateName(value),
            other => Self::Repo(other),
        }
    }
}

impl From<SearchError> for SkillServiceError {
    fn from(value: SearchError) -> Self {
        Self::SearchUnavailable(value)
    }
}

impl From<SkillValidationError> for SkillServiceError {
    fn from(value: SkillValidationError) -> Self {
        Self::Validation(value)
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillListResult {
    pub items: Vec<Skill>,
    /// Rows matching the filters, ignoring pagination.
    pub total: u64,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Skill service facade over repository implementations.
pub struct SkillService<R: SkillRepository> {
    repo: R,
}

impl<R: SkillRepository> SkillService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one skill and returns the persisted record.
    pub fn create_skill(&self, input: &NewSkill) -> Result<Skill, SkillServiceError> {
        input.validate()?;
        if self.repo.get_skill_by_name(&input.name)?.is_some() {
            return Err(SkillServiceError::DuplicateName(input.name.clone()));
        }

        let id = self.repo.create_skill(input)?;
        self.repo
            .get_skill(id, false)?
            .ok_or(SkillServiceError::InconsistentState(
                "created skill not found in read-back",
            ))
    }

    /// Replaces a live skill's editable fields and returns the stored record.
    pub fn update_skill(&self, skill: &Skill) -> Result<Skill, SkillServiceError> {
        skill.validate()?;
        if let Some(existing) = self.repo.get_skill_by_name(&skill.name)? {
            if existing.id != skill.id {
                return Err(SkillServiceError::DuplicateName(skill.name.clone()));
            }
        }

        self.repo.update_skill(skill)?;
        self.repo
            .get_skill(skill.id, false)?
            .ok_or(SkillServiceError::InconsistentState(
                "updated skill not found in read-back",
            ))
    }

    /// Gets one live skill.
    pub fn get_skill(&self, id: SkillId) -> Result<Skill, SkillServiceError> {
        self.repo
            .get_skill(id, false)?
            .ok_or(SkillServiceError::SkillNotFound(id))
    }

    pub fn list_skills(&self, query: &SkillListQuery) -> Result<SkillListResult, SkillServiceError> {
        let applied_limit = normalize_skill_limit(query.limit);
        let query = SkillListQuery {
            limit: Some(applied_limit),
            ..query.clone()
        };
        Ok(SkillListResult {
            items: self.repo.list_skills(&query)?,
            total: self.repo.count_skills(&query)?,
            applied_limit,
        })
    }

    /// Lists the recycle bin.
    pub fn list_deleted_skills(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<SkillListResult, SkillServiceError> {
        self.list_skills(&SkillListQuery {
            scope: SkillScope::Deleted,
            limit,
            offset,
            ..SkillListQuery::default()
        })
    }

    pub fn delete_skill(&self, id: SkillId) -> Result<(), SkillServiceError> {
        self.repo.soft_delete_skill(id)?;
        Ok(())
    }

    pub fn restore_skill(&self, id: SkillId) -> Result<Skill, SkillServiceError> {
        self.repo.restore_skill(id)?;
        self.get_skill(id)
    }

    /// Permanently removes a skill that is already in the recycle bin.
    pub fn destroy_skill(&self, id: SkillId) -> Result<(), SkillServiceError> {
        self.repo.destroy_skill(id)?;
        Ok(())
    }

    /// Returns live skills ranked against `keyword`, best match first.
    ///
    /// A keyword without extractable terms lists every live skill.
    pub fn search_skills(&self, keyword: &str) -> Result<Vec<Skill>, SkillServiceError> {
        let matches = self.repo.search_skills(keyword)?;
        Ok(matches.into_iter().map(|hit| hit.skill).collect())
    }

    /// Returns at most `limit` ranked hits with their match counts.
    ///
    /// `None` or `Some(0)` applies [`SEARCH_RESULT_LIMIT`].
    pub fn search_matches(
        &self,
        keyword: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SkillMatch>, SkillServiceError> {
        let mut matches = self.repo.search_skills(keyword)?;
        let limit = match limit {
            Some(limit) if limit > 0 => limit,
            _ => SEARCH_RESULT_LIMIT,
        };
        matches.truncate(limit);
        Ok(matches)
    }
}
