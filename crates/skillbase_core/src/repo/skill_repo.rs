//! Skill repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist skills and keep their term index in step with every write.
//! - Own the soft delete / restore / destroy lifecycle.
//! - Expose keyword search over live skills.
//!
//! # Invariants
//! - Create and update commit the skill row and its index rows together.
//! - Soft delete and restore leave index rows untouched.
//! - Destroy removes index rows and the skill row in one transaction and is
//!   refused for a live skill.

use crate::invalidation::{apply_purge, Mutation};
use crate::model::lifecycle::Lifecycle;
use crate::model::now_epoch_ms;
use crate::model::skill::{NewSkill, Skill, SkillId};
use crate::model::tag::TagId;
use crate::repo::{map_unique_violation, RepoError, RepoResult};
use crate::search::index::{apply_and_reindex, IndexedDocument};
use crate::search::ranker::{self, SearchResult, SkillMatch};
use crate::search::tokenizer::Tokenizer;
use log::info;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

const SKILLS_DEFAULT_LIMIT: u32 = 20;
const SKILLS_LIMIT_MAX: u32 = 100;

/// Column list shared by every skill read; append `WHERE`/`ORDER BY`.
pub(crate) const SKILL_SELECT_SQL: &str = "SELECT
    id,
    name,
    resource_dir,
    description,
    version,
    license,
    compatibility,
    metadata,
    allowed_tools,
    detail,
    created_at,
    updated_at,
    deleted_at
 FROM skills";

/// Which lifecycle states a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkillScope {
    #[default]
    Live,
    /// Recycle bin view, most recently deleted first.
    Deleted,
    All,
}

/// Query options for skill listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillListQuery {
    pub scope: SkillScope,
    /// Only skills linked to this tag.
    pub tag_id: Option<TagId>,
    /// Inclusive lower bound on `created_at` (epoch ms).
    pub created_from: Option<i64>,
    /// Inclusive upper bound on `created_at` (epoch ms).
    pub created_to: Option<i64>,
    /// Maximum rows to return. Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for skill persistence and search.
pub trait SkillRepository {
    /// Validates, inserts and indexes one skill. Returns its new id.
    fn create_skill(&self, skill: &NewSkill) -> RepoResult<SkillId>;
    /// Replaces every editable field of a live skill and reindexes it.
    ///
    /// A blank `resource_dir` is replaced with a generated one.
    fn update_skill(&self, skill: &Skill) -> RepoResult<()>;
    fn get_skill(&self, id: SkillId, include_deleted: bool) -> RepoResult<Option<Skill>>;
    /// Looks up a skill by exact name, deleted skills included.
    fn get_skill_by_name(&self, name: &str) -> RepoResult<Option<Skill>>;
    fn list_skills(&self, query: &SkillListQuery) -> RepoResult<Vec<Skill>>;
    /// Counts rows matching `query`, ignoring limit and offset.
    fn count_skills(&self, query: &SkillListQuery) -> RepoResult<u64>;
    /// Moves a skill to the recycle bin. Already deleted skills are a no-op.
    fn soft_delete_skill(&self, id: SkillId) -> RepoResult<()>;
    /// Brings a skill back from the recycle bin. Live skills are a no-op.
    fn restore_skill(&self, id: SkillId) -> RepoResult<()>;
    /// Permanently removes a soft-deleted skill and its index rows.
    fn destroy_skill(&self, id: SkillId) -> RepoResult<()>;
    /// Ranks live skills against `keyword`.
    fn search_skills(&self, keyword: &str) -> SearchResult<Vec<SkillMatch>>;
}

/// SQLite-backed skill repository.
pub struct SqliteSkillRepository<'conn> {
    conn: &'conn Connection,
    tokenizer: &'conn Tokenizer,
}

impl<'conn> SqliteSkillRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn new(conn: &'conn Connection, tokenizer: &'conn Tokenizer) -> Self {
        Self { conn, tokenizer }
    }

    fn lifecycle_of(&self, id: SkillId) -> RepoResult<Option<Lifecycle>> {
        let deleted_at = self
            .conn
            .query_row(
                "SELECT deleted_at FROM skills WHERE id = ?1;",
                [id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        Ok(deleted_at.map(Lifecycle::from_deleted_at))
    }
}

impl SkillRepository for SqliteSkillRepository<'_> {
    fn create_skill(&self, skill: &NewSkill) -> RepoResult<SkillId> {
        skill.validate()?;
        let resource_dir = skill.resolved_resource_dir();

        let id = apply_and_reindex(self.conn, self.tokenizer, |tx| {
            let now = now_epoch_ms();
            tx.execute(
                "INSERT INTO skills (
                    name,
                    resource_dir,
                    description,
                    version,
                    license,
                    compatibility,
                    metadata,
                    allowed_tools,
                    detail,
                    created_at,
                    updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10);",
                params![
                    skill.name,
                    resource_dir,
                    skill.description,
                    skill.version,
                    skill.license,
                    skill.compatibility,
                    skill.metadata,
                    skill.allowed_tools,
                    skill.detail,
                    now,
                ],
            )
            .map_err(|err| {
                map_unique_violation(
                    err,
                    "skill",
                    &[
                        ("name", skill.name.as_str()),
                        ("resource_dir", resource_dir.as_str()),
                    ],
                )
            })?;

            Ok::<_, RepoError>(IndexedDocument {
                skill_id: tx.last_insert_rowid(),
                text: skill.indexed_text(),
            })
        })?;

        info!(
            "event=skill_write module=repo status=ok op=create skill_id={}",
            id
        );
        Ok(id)
    }

    fn update_skill(&self, skill: &Skill) -> RepoResult<()> {
        skill.validate()?;
        let resource_dir = skill.resolved_resource_dir();

        apply_and_reindex(self.conn, self.tokenizer, |tx| -> RepoResult<IndexedDocument> {
            let changed = tx
                .execute(
                    "UPDATE skills
                     SET
                        name = ?2,
                        resource_dir = ?3,
                        description = ?4,
                        version = ?5,
                        license = ?6,
                        compatibility = ?7,
                        metadata = ?8,
                        allowed_tools = ?9,
                        detail = ?10,
                        updated_at = ?11
                     WHERE id = ?1
                       AND deleted_at IS NULL;",
                    params![
                        skill.id,
                        skill.name,
                        resource_dir,
                        skill.description,
                        skill.version,
                        skill.license,
                        skill.compatibility,
                        skill.metadata,
                        skill.allowed_tools,
                        skill.detail,
                        now_epoch_ms(),
                    ],
                )
                .map_err(|err| {
                    map_unique_violation(
                        err,
                        "skill",
                        &[
                            ("name", skill.name.as_str()),
                            ("resource_dir", resource_dir.as_str()),
                        ],
                    )
                })?;

            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "skill",
                    id: skill.id,
                });
            }

            Ok(IndexedDocument {
                skill_id: skill.id,
                text: skill.indexed_text(),
            })
        })?;

        info!(
            "event=skill_write module=repo status=ok op=update skill_id={}",
            skill.id
        );
        Ok(())
    }

    fn get_skill(&self, id: SkillId, include_deleted: bool) -> RepoResult<Option<Skill>> {
        let sql = if include_deleted {
            format!("{SKILL_SELECT_SQL} WHERE id = ?1;")
        } else {
            format!("{SKILL_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;")
        };
        let skill = self
            .conn
            .query_row(&sql, [id], parse_skill_row)
            .optional()?;
        Ok(skill)
    }

    fn get_skill_by_name(&self, name: &str) -> RepoResult<Option<Skill>> {
        let skill = self
            .conn
            .query_row(
                &format!("{SKILL_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_skill_row,
            )
            .optional()?;
        Ok(skill)
    }

    fn list_skills(&self, query: &SkillListQuery) -> RepoResult<Vec<Skill>> {
        let (filter, mut bind_values) = build_list_filter(query);
        let mut sql = format!("{SKILL_SELECT_SQL}{filter}");

        match query.scope {
            SkillScope::Deleted => sql.push_str(" ORDER BY deleted_at DESC, id ASC"),
            SkillScope::Live | SkillScope::All => sql.push_str(" ORDER BY id ASC"),
        }
        sql.push_str(" LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_skill_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), parse_skill_row)?;
        let skills = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(skills)
    }

    fn count_skills(&self, query: &SkillListQuery) -> RepoResult<u64> {
        let (filter, bind_values) = build_list_filter(query);
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM skills{filter};"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative skill count {total}")))
    }

    fn soft_delete_skill(&self, id: SkillId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE skills
             SET deleted_at = ?2
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id, now_epoch_ms()],
        )?;
        if changed == 0 && self.lifecycle_of(id)?.is_none() {
            return Err(RepoError::NotFound { entity: "skill", id });
        }

        info!(
            "event=skill_write module=repo status=ok op=soft_delete skill_id={} changed={}",
            id, changed
        );
        Ok(())
    }

    fn restore_skill(&self, id: SkillId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE skills
             SET deleted_at = NULL
             WHERE id = ?1
               AND deleted_at IS NOT NULL;",
            [id],
        )?;
        if changed == 0 && self.lifecycle_of(id)?.is_none() {
            return Err(RepoError::NotFound { entity: "skill", id });
        }

        info!(
            "event=skill_write module=repo status=ok op=restore skill_id={} changed={}",
            id, changed
        );
        Ok(())
    }

    fn destroy_skill(&self, id: SkillId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let deleted_at = tx
            .query_row(
                "SELECT deleted_at FROM skills WHERE id = ?1;",
                [id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        match deleted_at.map(Lifecycle::from_deleted_at) {
            None => return Err(RepoError::NotFound { entity: "skill", id }),
            Some(Lifecycle::Active) => return Err(RepoError::NotDeleted { entity: "skill", id }),
            Some(Lifecycle::Deleted { .. }) => {}
        }

        let purged = apply_purge(&tx, Mutation::SkillDestroyed(id))?;
        tx.execute("DELETE FROM skills WHERE id = ?1;", [id])?;
        tx.commit()?;

        info!(
            "event=skill_write module=repo status=ok op=destroy skill_id={} purged_terms={}",
            id, purged
        );
        Ok(())
    }

    fn search_skills(&self, keyword: &str) -> SearchResult<Vec<SkillMatch>> {
        ranker::search_skills(self.conn, self.tokenizer, keyword)
    }
}

/// Normalizes list limit according to the skills listing contract.
pub fn normalize_skill_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => SKILLS_DEFAULT_LIMIT,
        Some(value) => value.min(SKILLS_LIMIT_MAX),
    }
}

/// Maps one row selected with [`SKILL_SELECT_SQL`] to a [`Skill`].
pub(crate) fn parse_skill_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: row.get("id")?,
        name: row.get("name")?,
        resource_dir: row.get("resource_dir")?,
        description: row.get("description")?,
        version: row.get("version")?,
        license: row.get("license")?,
        compatibility: row.get("compatibility")?,
        metadata: row.get("metadata")?,
        allowed_tools: row.get("allowed_tools")?,
        detail: row.get("detail")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        lifecycle: Lifecycle::from_deleted_at(row.get("deleted_at")?),
    })
}

fn build_list_filter(query: &SkillListQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut bind_values = Vec::new();

    match query.scope {
        SkillScope::Live => clauses.push("deleted_at IS NULL".to_string()),
        SkillScope::Deleted => clauses.push("deleted_at IS NOT NULL".to_string()),
        SkillScope::All => {}
    }
    if let Some(tag_id) = query.tag_id {
        clauses.push(
            "EXISTS (
                SELECT 1
                FROM skill_tags st
                WHERE st.skill_id = skills.id
                  AND st.tag_id = ?
            )"
            .to_string(),
        );
        bind_values.push(Value::Integer(tag_id));
    }
    if let Some(from) = query.created_from {
        clauses.push("created_at >= ?".to_string());
        bind_values.push(Value::Integer(from));
    }
    if let Some(to) = query.created_to {
        clauses.push("created_at <= ?".to_string());
        bind_values.push(Value::Integer(to));
    }

    if clauses.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
    }
}
