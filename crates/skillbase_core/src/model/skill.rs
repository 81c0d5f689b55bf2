//! Skill domain model.
//!
//! # Responsibility
//! - Define the reusable capability descriptor stored in the knowledge base.
//! - Own field-level validation applied before any write.
//!
//! # Invariants
//! - `name` is unique across all skills, deleted ones included.
//! - The indexed text of a skill is exactly `name + " " + description`.
//! - Metadata fields are opaque to the search index.

use crate::model::lifecycle::Lifecycle;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NAME_MAX_CHARS: usize = 100;
const RESOURCE_DIR_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 1024;

/// Store-assigned skill identifier. Monotonic in creation order.
pub type SkillId = i64;

/// Persisted skill record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    /// Directory holding the skill's bundled resources.
    pub resource_dir: String,
    pub description: String,
    pub version: String,
    pub license: String,
    pub compatibility: String,
    /// Free-form key/value metadata, stored verbatim.
    pub metadata: String,
    /// Space separated list of pre-approved tools.
    pub allowed_tools: String,
    /// Long-form markdown body.
    pub detail: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub lifecycle: Lifecycle,
}

impl Skill {
    /// Text fed to the tokenizer when (re)building this skill's index rows.
    pub fn indexed_text(&self) -> String {
        indexed_text(&self.name, &self.description)
    }

    pub fn validate(&self) -> Result<(), SkillValidationError> {
        validate_fields(&self.name, Some(&self.resource_dir), &self.description)
    }

    /// Returns the stored resource directory, or a generated one when blank.
    pub fn resolved_resource_dir(&self) -> String {
        resolve_resource_dir(Some(&self.resource_dir))
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }
}

/// Input model for skill creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSkill {
    pub name: String,
    /// Generated when `None` or blank.
    pub resource_dir: Option<String>,
    pub description: String,
    pub version: String,
    pub license: String,
    pub compatibility: String,
    pub metadata: String,
    pub allowed_tools: String,
    pub detail: String,
}

impl NewSkill {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn indexed_text(&self) -> String {
        indexed_text(&self.name, &self.description)
    }

    pub fn validate(&self) -> Result<(), SkillValidationError> {
        validate_fields(&self.name, self.resource_dir.as_deref(), &self.description)
    }

    /// Returns the caller-provided resource directory or a generated one.
    pub fn resolved_resource_dir(&self) -> String {
        resolve_resource_dir(self.resource_dir.as_deref())
    }
}

/// Field-level validation failure for skill writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillValidationError {
    EmptyName,
    NameTooLong { chars: usize },
    ResourceDirTooLong { chars: usize },
    DescriptionTooLong { chars: usize },
}

impl Display for SkillValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "skill name cannot be empty"),
            Self::NameTooLong { chars } => {
                write!(f, "skill name has {chars} chars; max is {NAME_MAX_CHARS}")
            }
            Self::ResourceDirTooLong { chars } => write!(
                f,
                "skill resource_dir has {chars} chars; max is {RESOURCE_DIR_MAX_CHARS}"
            ),
            Self::DescriptionTooLong { chars } => write!(
                f,
                "skill description has {chars} chars; max is {DESCRIPTION_MAX_CHARS}"
            ),
        }
    }
}

impl Error for SkillValidationError {}

/// Generates a resource directory name such as `skill-1a2b3c4d`.
pub fn generate_resource_dir() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("skill-{}", &simple[..8])
}

fn resolve_resource_dir(dir: Option<&str>) -> String {
    match dir.map(str::trim) {
        Some(dir) if !dir.is_empty() => dir.to_string(),
        _ => generate_resource_dir(),
    }
}

fn indexed_text(name: &str, description: &str) -> String {
    format!("{name} {description}")
}

fn validate_fields(
    name: &str,
    resource_dir: Option<&str>,
    description: &str,
) -> Result<(), SkillValidationError> {
    if name.trim().is_empty() {
        return Err(SkillValidationError::EmptyName);
    }
    let name_chars = name.chars().count();
    if name_chars > NAME_MAX_CHARS {
        return Err(SkillValidationError::NameTooLong { chars: name_chars });
    }
    if let Some(dir) = resource_dir {
        let dir_chars = dir.chars().count();
        if dir_chars > RESOURCE_DIR_MAX_CHARS {
            return Err(SkillValidationError::ResourceDirTooLong { chars: dir_chars });
        }
    }
    let description_chars = description.chars().count();
    if description_chars > DESCRIPTION_MAX_CHARS {
        return Err(SkillValidationError::DescriptionTooLong {
            chars: description_chars,
        });
    }
    Ok(())
}
