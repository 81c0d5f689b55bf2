//! Tag use-case service.
//!
//! # Responsibility
//! - Normalize tag input, apply duplicate-name checks and page defaults.
//! - Manage skill/tag links.

use crate::model::skill::SkillId;
use crate::model::tag::{Tag, TagId, TagPage};
use crate::repo::tag_repo::TagRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;
const TAG_NAME_MAX_CHARS: usize = 50;

/// Service error for tag use-cases.
#[derive(Debug)]
pub enum TagServiceError {
    /// Name is blank or too long.
    InvalidName(String),
    TagNotFound(TagId),
    SkillNotFound(SkillId),
    DuplicateName(String),
    Repo(RepoError),
}

impl Display for TagServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid tag name: `{name}`"),
            Self::TagNotFound(id) => write!(f, "tag not found: {id}"),
            Self::SkillNotFound(id) => write!(f, "skill not found: {id}"),
            Self::DuplicateName(name) => write!(f, "tag name already exists: `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TagServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TagServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "tag", id } => Self::TagNotFound(id),
            RepoError::NotFound { entity: "skill", id } => Self::SkillNotFound(id),
            RepoError::Duplicate { value, .. } => Self::DuplicateName(value),
            other => Self::Repo(other),
        }
    }
}

/// Tag service facade over repository implementations.
pub struct TagService<R: TagRepository> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_tag(&self, name: &str) -> Result<Tag, TagServiceError> {
        let name = normalize_tag_name(name)?;
        if self.repo.get_tag_by_name(&name)?.is_some() {
            return Err(TagServiceError::DuplicateName(name));
        }
        Ok(self.repo.create_tag(&name)?)
    }

    pub fn get_tag(&self, id: TagId) -> Result<Tag, TagServiceError> {
        self.repo
            .get_tag(id)?
            .ok_or(TagServiceError::TagNotFound(id))
    }

    /// Lists one page of tags. Missing or zero values default to page 1 of
    /// size 10; page size clamps to 100.
    pub fn list_tags(
        &self,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<TagPage, TagServiceError> {
        let page = page.filter(|value| *value > 0).unwrap_or(DEFAULT_PAGE);
        let page_size = page_size
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        Ok(self.repo.list_tags(page, page_size)?)
    }

    pub fn rename_tag(&self, id: TagId, name: &str) -> Result<Tag, TagServiceError> {
        let name = normalize_tag_name(name)?;
        let current = self.get_tag(id)?;
        if current.name == name {
            return Ok(current);
        }
        if let Some(existing) = self.repo.get_tag_by_name(&name)? {
            if existing.id != id {
                return Err(TagServiceError::DuplicateName(name));
            }
        }
        Ok(self.repo.rename_tag(id, &name)?)
    }

    pub fn delete_tag(&self, id: TagId) -> Result<(), TagServiceError> {
        self.repo.delete_tag(id)?;
        Ok(())
    }

    pub fn add_tag_to_skill(&self, skill_id: SkillId, tag_id: TagId) -> Result<(), TagServiceError> {
        self.repo.add_tag_to_skill(skill_id, tag_id)?;
        Ok(())
    }

    pub fn remove_tag_from_skill(
        &self,
        skill_id: SkillId,
        tag_id: TagId,
    ) -> Result<(), TagServiceError> {
        self.repo.remove_tag_from_skill(skill_id, tag_id)?;
        Ok(())
    }

    /// Atomically replaces the full tag set of one skill.
    pub fn set_skill_tags(
        &self,
        skill_id: SkillId,
        tag_ids: &[TagId],
    ) -> Result<Vec<Tag>, TagServiceError> {
        self.repo.set_skill_tags(skill_id, tag_ids)?;
        Ok(self.repo.tags_for_skill(skill_id)?)
    }

    pub fn tags_for_skill(&self, skill_id: SkillId) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.tags_for_skill(skill_id)?)
    }
}

/// Trims a tag name and rejects blank or overlong values.
pub fn normalize_tag_name(name: &str) -> Result<String, TagServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > TAG_NAME_MAX_CHARS {
        return Err(TagServiceError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_tag_name, TagServiceError};

    #[test]
    fn tag_names_are_trimmed() {
        assert_eq!(normalize_tag_name("  pdf ").unwrap(), "pdf");
    }

    #[test]
    fn blank_and_overlong_names_are_rejected() {
        assert!(matches!(
            normalize_tag_name("   "),
            Err(TagServiceError::InvalidName(_))
        ));
        assert!(matches!(
            normalize_tag_name(&"x".repeat(51)),
            Err(TagServiceError::InvalidName(_))
        ));
    }
}
