//! Tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist tags and skill/tag links.
//! - Serve tag detail, tag pages and the tag total through the tag cache.
//!
//! # Invariants
//! - Every committed tag mutation clears the whole `tag:` namespace.
//! - Link changes do not touch the cache; cached values never carry links.
//! - A failed write leaves the cache as it was.

use crate::cache::{keys, TagCacheValue};
use crate::invalidation::{Invalidator, Mutation};
use crate::model::now_epoch_ms;
use crate::model::skill::SkillId;
use crate::model::tag::{Tag, TagId, TagPage};
use crate::repo::{map_unique_violation, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::time::Duration;

const TAG_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM tags";

/// Repository interface for tag operations.
pub trait TagRepository {
    fn create_tag(&self, name: &str) -> RepoResult<Tag>;
    /// Gets one tag by id, served from the cache when present.
    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    fn get_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>>;
    /// Lists one 1-based page of tags ordered by id.
    fn list_tags(&self, page: u32, page_size: u32) -> RepoResult<TagPage>;
    fn rename_tag(&self, id: TagId, name: &str) -> RepoResult<Tag>;
    /// Deletes a tag and every skill link pointing at it.
    fn delete_tag(&self, id: TagId) -> RepoResult<()>;
    fn add_tag_to_skill(&self, skill_id: SkillId, tag_id: TagId) -> RepoResult<()>;
    fn remove_tag_from_skill(&self, skill_id: SkillId, tag_id: TagId) -> RepoResult<()>;
    /// Replaces the full tag set of one skill in a single transaction.
    fn set_skill_tags(&self, skill_id: SkillId, tag_ids: &[TagId]) -> RepoResult<()>;
    fn tags_for_skill(&self, skill_id: SkillId) -> RepoResult<Vec<Tag>>;
}

/// SQLite-backed tag repository with a read-through cache.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
    invalidator: &'conn Invalidator,
    ttl: Duration,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// `ttl` applies to every entry this repository caches.
    pub fn new(conn: &'conn Connection, invalidator: &'conn Invalidator, ttl: Duration) -> Self {
        Self {
            conn,
            invalidator,
            ttl,
        }
    }

    fn load_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(&format!("{TAG_SELECT_SQL} WHERE id = ?1;"), [id], parse_tag_row)
            .optional()?;
        Ok(tag)
    }

    fn load_page(&self, page: u32, page_size: u32) -> RepoResult<Vec<Tag>> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let mut stmt = self.conn.prepare(&format!(
            "{TAG_SELECT_SQL} ORDER BY id ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let rows = stmt.query_map(params![i64::from(page_size), offset], parse_tag_row)?;
        let tags = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    fn load_total(&self) -> RepoResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tags;", [], |row| row.get(0))?;
        u64::try_from(total).map_err(|_| RepoError::InvalidData(format!("negative tag count {total}")))
    }

    fn committed(&self, op: &str, id: TagId) {
        let removed = self.invalidator.after_commit(Mutation::TagChanged);
        info!(
            "event=tag_write module=repo status=ok op={} tag_id={} cache_removed={}",
            op, id, removed
        );
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn create_tag(&self, name: &str) -> RepoResult<Tag> {
        let now = now_epoch_ms();
        self.conn
            .execute(
                "INSERT INTO tags (name, created_at, updated_at) VALUES (?1, ?2, ?2);",
                params![name, now],
            )
            .map_err(|err| map_unique_violation(err, "tag", &[("name", name)]))?;

        let tag = Tag {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.committed("create", tag.id);
        Ok(tag)
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let cache = self.invalidator.tag_cache();
        let key = keys::tag(id);
        if let Some(TagCacheValue::Tag(tag)) = cache.get(&key) {
            return Ok(Some(tag));
        }
        let seen = cache.generation();

        // Misses are not cached; a later create must be visible at once.
        let tag = self.load_tag(id)?;
        if let Some(tag) = &tag {
            cache.set_if_unchanged(key, TagCacheValue::Tag(tag.clone()), self.ttl, seen);
        }
        Ok(tag)
    }

    fn get_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                &format!("{TAG_SELECT_SQL} WHERE name = ?1;"),
                [name],
                parse_tag_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn list_tags(&self, page: u32, page_size: u32) -> RepoResult<TagPage> {
        let cache = self.invalidator.tag_cache();
        let seen = cache.generation();

        let items = match cache.get(&keys::tag_list(page, page_size)) {
            Some(TagCacheValue::Page(items)) => items,
            _ => {
                let items = self.load_page(page, page_size)?;
                cache.set_if_unchanged(
                    keys::tag_list(page, page_size),
                    TagCacheValue::Page(items.clone()),
                    self.ttl,
                    seen,
                );
                items
            }
        };
        let total = match cache.get(keys::TAG_TOTAL) {
            Some(TagCacheValue::Total(total)) => total,
            _ => {
                let total = self.load_total()?;
                cache.set_if_unchanged(
                    keys::TAG_TOTAL,
                    TagCacheValue::Total(total),
                    self.ttl,
                    seen,
                );
                total
            }
        };

        Ok(TagPage {
            items,
            total,
            page,
            page_size,
        })
    }

    fn rename_tag(&self, id: TagId, name: &str) -> RepoResult<Tag> {
        let now = now_epoch_ms();
        let changed = self
            .conn
            .execute(
                "UPDATE tags SET name = ?2, updated_at = ?3 WHERE id = ?1;",
                params![id, name, now],
            )
            .map_err(|err| map_unique_violation(err, "tag", &[("name", name)]))?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "tag", id });
        }

        self.committed("rename", id);
        self.load_tag(id)?
            .ok_or(RepoError::NotFound { entity: "tag", id })
    }

    fn delete_tag(&self, id: TagId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM skill_tags WHERE tag_id = ?1;", [id])?;
        let changed = tx.execute("DELETE FROM tags WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "tag", id });
        }
        tx.commit()?;

        self.committed("delete", id);
        Ok(())
    }

    fn add_tag_to_skill(&self, skill_id: SkillId, tag_id: TagId) -> RepoResult<()> {
        ensure_link_targets(self.conn, skill_id, tag_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO skill_tags (skill_id, tag_id) VALUES (?1, ?2);",
            params![skill_id, tag_id],
        )?;
        Ok(())
    }

    fn remove_tag_from_skill(&self, skill_id: SkillId, tag_id: TagId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM skill_tags WHERE skill_id = ?1 AND tag_id = ?2;",
            params![skill_id, tag_id],
        )?;
        Ok(())
    }

    fn set_skill_tags(&self, skill_id: SkillId, tag_ids: &[TagId]) -> RepoResult<()> {
        let unique = tag_ids.iter().copied().collect::<BTreeSet<_>>();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !row_exists(&tx, "skills", skill_id)? {
            return Err(RepoError::NotFound {
                entity: "skill",
                id: skill_id,
            });
        }

        tx.execute("DELETE FROM skill_tags WHERE skill_id = ?1;", [skill_id])?;
        for tag_id in unique {
            if !row_exists(&tx, "tags", tag_id)? {
                return Err(RepoError::NotFound {
                    entity: "tag",
                    id: tag_id,
                });
            }
            tx.execute(
                "INSERT INTO skill_tags (skill_id, tag_id) VALUES (?1, ?2);",
                params![skill_id, tag_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn tags_for_skill(&self, skill_id: SkillId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.created_at, t.updated_at
             FROM tags t
             INNER JOIN skill_tags st ON st.tag_id = t.id
             WHERE st.skill_id = ?1
             ORDER BY t.id ASC;",
        )?;
        let rows = stmt.query_map([skill_id], parse_tag_row)?;
        let tags = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }
}

fn parse_tag_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn ensure_link_targets(conn: &Connection, skill_id: SkillId, tag_id: TagId) -> RepoResult<()> {
    if !row_exists(conn, "skills", skill_id)? {
        return Err(RepoError::NotFound {
            entity: "skill",
            id: skill_id,
        });
    }
    if !row_exists(conn, "tags", tag_id)? {
        return Err(RepoError::NotFound {
            entity: "tag",
            id: tag_id,
        });
    }
    Ok(())
}

fn row_exists(conn: &Connection, table: &'static str, id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
