//! Term index maintenance over the `skill_tokens` table.
//!
//! # Responsibility
//! - Replace a skill's term rows in the same transaction as the skill write.
//! - Purge term rows on permanent deletion.
//! - Count distinct matched terms per skill for a query term set.
//!
//! # Invariants
//! - A committed skill never has a mixed-generation index: rebuild deletes
//!   and re-inserts inside one transaction, and a failure rolls back both
//!   the rows and the enclosing skill write.
//! - Soft deletion never touches index rows; filtering deleted skills is the
//!   ranker's job.
//! - `lookup` omits skills with zero matches.
//! - Standalone rebuilds only write rows for a skill that exists.
//!
//! Cancellation belongs to the caller: every entry point runs on a
//! caller-owned `Connection`, and `Connection::get_interrupt_handle` aborts an
//! in-flight statement with `SQLITE_INTERRUPT`, surfaced as an [`IndexError`].

use crate::db::DbError;
use crate::model::skill::SkillId;
use crate::search::tokenizer::Tokenizer;
use log::{debug, error};
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Max bound parameters per lookup statement.
const LOOKUP_CHUNK_SIZE: usize = 500;

pub type IndexResult<T> = Result<T, IndexError>;

/// Index operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    Rebuild,
    Purge,
    Lookup,
}

impl IndexOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rebuild => "rebuild",
            Self::Purge => "purge",
            Self::Lookup => "lookup",
        }
    }
}

/// Why an index operation failed.
#[derive(Debug)]
pub enum IndexFailure {
    Store(DbError),
    /// No skill row carries the id being indexed.
    SkillMissing,
}

impl Display for IndexFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::SkillMissing => write!(f, "skill does not exist"),
        }
    }
}

/// Failure while maintaining or reading the term index.
///
/// The enclosing mutation must be treated as failed.
#[derive(Debug)]
pub struct IndexError {
    pub op: IndexOp,
    /// `None` for lookups, which span many skills.
    pub skill_id: Option<SkillId>,
    pub source: IndexFailure,
}

impl IndexError {
    fn new(op: IndexOp, skill_id: Option<SkillId>, source: impl Into<DbError>) -> Self {
        Self {
            op,
            skill_id,
            source: IndexFailure::Store(source.into()),
        }
    }

    /// See [`DbError::is_transient`]. A missing skill is never transient.
    pub fn is_transient(&self) -> bool {
        match &self.source {
            IndexFailure::Store(err) => err.is_transient(),
            IndexFailure::SkillMissing => false,
        }
    }

    pub fn is_skill_missing(&self) -> bool {
        matches!(self.source, IndexFailure::SkillMissing)
    }
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.skill_id {
            Some(skill_id) => write!(
                f,
                "index {} failed for skill {skill_id}: {}",
                self.op.as_str(),
                self.source
            ),
            None => write!(f, "index {} failed: {}", self.op.as_str(), self.source),
        }
    }
}

impl Error for IndexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            IndexFailure::Store(err) => Some(err),
            IndexFailure::SkillMissing => None,
        }
    }
}

/// Skill identity and text produced by a write, to be indexed in the same
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDocument {
    pub skill_id: SkillId,
    pub text: String,
}

/// Runs `write` and the reindex of the document it returns as one atomic
/// unit of work.
///
/// Opens an `IMMEDIATE` transaction so concurrent writers to the same store
/// serialize instead of interleaving delete/insert phases. Any error from
/// `write`, the rebuild or the commit rolls everything back.
pub fn apply_and_reindex<E, F>(conn: &Connection, tokenizer: &Tokenizer, write: F) -> Result<SkillId, E>
where
    F: FnOnce(&Transaction<'_>) -> Result<IndexedDocument, E>,
    E: From<IndexError> + From<rusqlite::Error>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let document = write(&tx)?;
    rebuild_index(&tx, tokenizer, document.skill_id, &document.text)?;
    tx.commit()?;
    Ok(document.skill_id)
}

/// Replaces all term rows of `skill_id` with the terms of `text`.
///
/// Returns the number of rows written. Empty text leaves the skill
/// unindexed.
pub fn rebuild_index(
    tx: &Transaction<'_>,
    tokenizer: &Tokenizer,
    skill_id: SkillId,
    text: &str,
) -> IndexResult<usize> {
    let started_at = Instant::now();
    let terms = tokenizer.tokenize(text);

    match replace_terms(tx, skill_id, &terms) {
        Ok(()) => {
            debug!(
                "event=index_rebuild module=search status=ok skill_id={} term_count={} duration_ms={}",
                skill_id,
                terms.len(),
                started_at.elapsed().as_millis()
            );
            Ok(terms.len())
        }
        Err(err) => {
            error!(
                "event=index_rebuild module=search status=error skill_id={} error={}",
                skill_id, err
            );
            Err(IndexError::new(IndexOp::Rebuild, Some(skill_id), err))
        }
    }
}

/// Deletes all term rows of `skill_id` inside the caller's transaction.
pub fn purge_index(tx: &Transaction<'_>, skill_id: SkillId) -> IndexResult<usize> {
    let removed = tx
        .execute("DELETE FROM skill_tokens WHERE skill_id = ?1;", [skill_id])
        .map_err(|err| {
            error!(
                "event=index_purge module=search status=error skill_id={} error={}",
                skill_id, err
            );
            IndexError::new(IndexOp::Purge, Some(skill_id), err)
        })?;
    debug!(
        "event=index_purge module=search status=ok skill_id={} removed={}",
        skill_id, removed
    );
    Ok(removed)
}

/// Rebuilds one skill's index in its own transaction.
///
/// Create/update paths use [`apply_and_reindex`] instead so the skill row
/// and its index commit together. An id with no skill row (live or deleted)
/// fails with [`IndexFailure::SkillMissing`] and writes nothing.
pub fn rebuild_skill_index(
    conn: &Connection,
    tokenizer: &Tokenizer,
    skill_id: SkillId,
    name: &str,
    description: &str,
) -> IndexResult<usize> {
    let wrap = |err: rusqlite::Error| IndexError::new(IndexOp::Rebuild, Some(skill_id), err);
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(wrap)?;
    let exists = tx
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM skills WHERE id = ?1);",
            [skill_id],
            |row| row.get::<_, bool>(0),
        )
        .map_err(wrap)?;
    if !exists {
        error!(
            "event=index_rebuild module=search status=error skill_id={} error=skill_missing",
            skill_id
        );
        return Err(IndexError {
            op: IndexOp::Rebuild,
            skill_id: Some(skill_id),
            source: IndexFailure::SkillMissing,
        });
    }
    let written = rebuild_index(&tx, tokenizer, skill_id, &format!("{name} {description}"))?;
    tx.commit().map_err(wrap)?;
    Ok(written)
}

/// Purges one skill's index in its own transaction.
pub fn purge_skill_index(conn: &Connection, skill_id: SkillId) -> IndexResult<usize> {
    let wrap = |err: rusqlite::Error| IndexError::new(IndexOp::Purge, Some(skill_id), err);
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(wrap)?;
    let removed = purge_index(&tx, skill_id)?;
    tx.commit().map_err(wrap)?;
    Ok(removed)
}

/// Counts, per skill, how many distinct `terms` its index rows contain.
///
/// Soft-deleted skills are included. An empty term set yields an empty map;
/// callers decide what an empty query means.
pub fn lookup(conn: &Connection, terms: &BTreeSet<String>) -> IndexResult<BTreeMap<SkillId, u32>> {
    let mut counts = BTreeMap::new();
    if terms.is_empty() {
        return Ok(counts);
    }

    let terms = terms.iter().collect::<Vec<_>>();
    // Chunks hold disjoint terms, so per-chunk distinct counts add up exactly.
    for chunk in terms.chunks(LOOKUP_CHUNK_SIZE) {
        count_chunk(conn, chunk, &mut counts).map_err(|err| {
            error!(
                "event=index_lookup module=search status=error term_count={} error={}",
                terms.len(),
                err
            );
            IndexError::new(IndexOp::Lookup, None, err)
        })?;
    }

    debug!(
        "event=index_lookup module=search status=ok term_count={} candidate_count={}",
        terms.len(),
        counts.len()
    );
    Ok(counts)
}

/// Returns the terms currently indexed for `skill_id`.
pub fn indexed_terms(conn: &Connection, skill_id: SkillId) -> IndexResult<BTreeSet<String>> {
    let read = || -> rusqlite::Result<BTreeSet<String>> {
        let mut stmt =
            conn.prepare("SELECT term FROM skill_tokens WHERE skill_id = ?1 ORDER BY term ASC;")?;
        let rows = stmt.query_map([skill_id], |row| row.get::<_, String>(0))?;
        rows.collect()
    };
    read().map_err(|err| IndexError::new(IndexOp::Lookup, Some(skill_id), err))
}

fn replace_terms(
    tx: &Transaction<'_>,
    skill_id: SkillId,
    terms: &BTreeSet<String>,
) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM skill_tokens WHERE skill_id = ?1;", [skill_id])?;
    let mut insert =
        tx.prepare_cached("INSERT INTO skill_tokens (skill_id, term) VALUES (?1, ?2);")?;
    for term in terms {
        insert.execute(params![skill_id, term])?;
    }
    Ok(())
}

fn count_chunk(
    conn: &Connection,
    terms: &[&String],
    counts: &mut BTreeMap<SkillId, u32>,
) -> rusqlite::Result<()> {
    let placeholders = vec!["?"; terms.len()].join(", ");
    let sql = format!(
        "SELECT skill_id, COUNT(DISTINCT term) AS match_count
         FROM skill_tokens
         WHERE term IN ({placeholders})
         GROUP BY skill_id;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(terms.iter()))?;
    while let Some(row) = rows.next()? {
        let skill_id: SkillId = row.get("skill_id")?;
        let matched: u32 = row.get("match_count")?;
        *counts.entry(skill_id).or_insert(0) += matched;
    }
    Ok(())
}
