//! Token-overlap ranking of skills for a keyword query.
//!
//! # Responsibility
//! - Turn a keyword into terms, fetch candidates from the term index and
//!   order them by how many distinct query terms they contain.
//!
//! # Invariants
//! - Results are ordered by match count descending, then skill id ascending.
//! - Soft-deleted skills never appear, even though the index still holds
//!   their rows.
//! - A query without extractable terms lists every live skill by id.
//! - A failed lookup or load yields `SearchError`, never a partial list.
//!
//! Callers cancel a search through `Connection::get_interrupt_handle` on the
//! connection they pass in; the interrupted statement fails and the search
//! returns `SearchError`.

use crate::db::DbError;
use crate::model::skill::{Skill, SkillId};
use crate::repo::skill_repo::{parse_skill_row, SKILL_SELECT_SQL};
use crate::search::index::{lookup, IndexError};
use crate::search::tokenizer::Tokenizer;
use log::{error, info};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const LOAD_CHUNK_SIZE: usize = 500;

pub type SearchResult<T> = Result<T, SearchError>;

/// Search could not be served. Callers surface this as "search unavailable".
#[derive(Debug)]
pub enum SearchError {
    Index(IndexError),
    Db(DbError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(err) => write!(f, "search unavailable: {err}"),
            Self::Db(err) => write!(f, "search unavailable: {err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<IndexError> for SearchError {
    fn from(value: IndexError) -> Self {
        Self::Index(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMatch {
    pub skill: Skill,
    /// Distinct query terms found in the skill; `0` for unfiltered listings.
    pub match_count: u32,
}

/// Ranks live skills against `keyword`.
pub fn search_skills(
    conn: &Connection,
    tokenizer: &Tokenizer,
    keyword: &str,
) -> SearchResult<Vec<SkillMatch>> {
    let started_at = Instant::now();
    let terms = tokenizer.tokenize(keyword);

    let result = if terms.is_empty() {
        list_live_skills(conn)
    } else {
        lookup(conn, &terms)
            .map_err(SearchError::from)
            .and_then(|counts| rank_candidates(conn, &counts))
    };

    match &result {
        Ok(matches) => info!(
            "event=skill_search module=search status=ok term_count={} hit_count={} duration_ms={}",
            terms.len(),
            matches.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=skill_search module=search status=error term_count={} error={}",
            terms.len(),
            err
        ),
    }
    result
}

/// Orders two hits by the ranking rule.
pub fn rank_order(left: &SkillMatch, right: &SkillMatch) -> Ordering {
    right
        .match_count
        .cmp(&left.match_count)
        .then_with(|| left.skill.id.cmp(&right.skill.id))
}

fn rank_candidates(
    conn: &Connection,
    counts: &BTreeMap<SkillId, u32>,
) -> SearchResult<Vec<SkillMatch>> {
    let ids = counts.keys().copied().collect::<Vec<_>>();
    let mut matches = Vec::with_capacity(ids.len());

    for chunk in ids.chunks(LOAD_CHUNK_SIZE) {
        for skill in load_live_skills(conn, chunk)? {
            if let Some(&match_count) = counts.get(&skill.id) {
                matches.push(SkillMatch { skill, match_count });
            }
        }
    }

    matches.sort_by(rank_order);
    Ok(matches)
}

fn load_live_skills(conn: &Connection, ids: &[SkillId]) -> SearchResult<Vec<Skill>> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "{SKILL_SELECT_SQL}
         WHERE id IN ({placeholders})
           AND deleted_at IS NULL;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), parse_skill_row)?;
    let skills = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(skills)
}

fn list_live_skills(conn: &Connection) -> SearchResult<Vec<SkillMatch>> {
    let mut stmt = conn.prepare(&format!(
        "{SKILL_SELECT_SQL}
         WHERE deleted_at IS NULL
         ORDER BY id ASC;"
    ))?;
    let rows = stmt.query_map([], parse_skill_row)?;
    let mut matches = Vec::new();
    for skill in rows {
        matches.push(SkillMatch {
            skill: skill?,
            match_count: 0,
        });
    }
    Ok(matches)
}
