//! Job task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist job tasks and their soft delete lifecycle.
//! - Serve the distinct project list of live tasks through the project cache.
//!
//! # Invariants
//! - Every committed task mutation drops the cached project list.
//! - The project list only ever reflects live tasks.
//! - Permanent deletion is refused for a live task.

use crate::cache::keys;
use crate::invalidation::{Invalidator, Mutation};
use crate::model::lifecycle::Lifecycle;
use crate::model::now_epoch_ms;
use crate::model::task::{
    parse_task_kind, parse_task_status, task_kind_to_db, task_status_to_db, JobTask, NewJobTask,
    TaskId, TaskKind, TaskStatus,
};
use crate::repo::{map_unique_violation, RepoError, RepoResult};
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::time::Duration;

const TASKS_DEFAULT_LIMIT: u32 = 10;
const TASKS_LIMIT_MAX: u32 = 100;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    job_no,
    project,
    type,
    goal,
    status,
    pass_accept_std,
    created_at,
    updated_at,
    deleted_at
 FROM job_tasks";

/// Query options for live task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub project: Option<String>,
    pub kind: Option<TaskKind>,
    pub status: Option<TaskStatus>,
    /// Inclusive lower bound on `created_at` (epoch ms).
    pub created_from: Option<i64>,
    /// Inclusive upper bound on `created_at` (epoch ms).
    pub created_to: Option<i64>,
    /// Maximum rows to return. Defaults to 10 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for job task operations.
pub trait TaskRepository {
    fn create_task(&self, task: &NewJobTask) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<JobTask>>;
    /// Updates the mutable progress fields of a live task.
    fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        pass_accept_std: bool,
    ) -> RepoResult<()>;
    /// Lists live tasks, newest first.
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<JobTask>>;
    fn count_tasks(&self, query: &TaskListQuery) -> RepoResult<u64>;
    /// Lists soft-deleted tasks, most recently deleted first.
    fn list_deleted_tasks(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<JobTask>>;
    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()>;
    /// Restores a soft-deleted task; a live or unknown id is `NotFound`.
    fn restore_task(&self, id: TaskId) -> RepoResult<()>;
    fn destroy_task(&self, id: TaskId) -> RepoResult<()>;
    /// Distinct projects of live tasks, served from the cache when present.
    fn list_projects(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed job task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
    invalidator: &'conn Invalidator,
    ttl: Duration,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// `ttl` applies to the cached project list.
    pub fn new(conn: &'conn Connection, invalidator: &'conn Invalidator, ttl: Duration) -> Self {
        Self {
            conn,
            invalidator,
            ttl,
        }
    }

    fn lifecycle_of(&self, id: TaskId) -> RepoResult<Option<Lifecycle>> {
        let deleted_at = self
            .conn
            .query_row(
                "SELECT deleted_at FROM job_tasks WHERE id = ?1;",
                [id],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;
        Ok(deleted_at.map(Lifecycle::from_deleted_at))
    }

    fn committed(&self, op: &str, id: TaskId) {
        let removed = self.invalidator.after_commit(Mutation::TaskChanged);
        info!(
            "event=task_write module=repo status=ok op={} task_id={} cache_removed={}",
            op, id, removed
        );
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &NewJobTask) -> RepoResult<TaskId> {
        let now = now_epoch_ms();
        self.conn
            .execute(
                "INSERT INTO job_tasks (
                    job_no,
                    project,
                    type,
                    goal,
                    status,
                    pass_accept_std,
                    created_at,
                    updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6);",
                params![
                    task.job_no,
                    task.project,
                    task_kind_to_db(task.kind),
                    task.goal,
                    task_status_to_db(TaskStatus::Created),
                    now,
                ],
            )
            .map_err(|err| map_unique_violation(err, "job task", &[("job_no", task.job_no.as_str())]))?;

        let id = self.conn.last_insert_rowid();
        self.committed("create", id);
        Ok(id)
    }

    fn get_task(&self, id: TaskId, include_deleted: bool) -> RepoResult<Option<JobTask>> {
        let sql = if include_deleted {
            format!("{TASK_SELECT_SQL} WHERE id = ?1;")
        } else {
            format!("{TASK_SELECT_SQL} WHERE id = ?1 AND deleted_at IS NULL;")
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_task_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        pass_accept_std: bool,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_tasks
             SET status = ?2, pass_accept_std = ?3, updated_at = ?4
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id, task_status_to_db(status), pass_accept_std, now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "job task",
                id,
            });
        }
        self.committed("update", id);
        Ok(())
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<JobTask>> {
        let (filter, mut bind_values) = build_list_filter(query);
        let sql = format!(
            "{TASK_SELECT_SQL}{filter} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?;"
        );
        bind_values.push(Value::Integer(i64::from(normalize_task_limit(query.limit))));
        bind_values.push(Value::Integer(i64::from(query.offset)));
        query_tasks(self.conn, &sql, bind_values)
    }

    fn count_tasks(&self, query: &TaskListQuery) -> RepoResult<u64> {
        let (filter, bind_values) = build_list_filter(query);
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM job_tasks{filter};"),
            params_from_iter(bind_values),
            |row| row.get(0),
        )?;
        u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative job task count {total}")))
    }

    fn list_deleted_tasks(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<JobTask>> {
        let sql = format!(
            "{TASK_SELECT_SQL}
             WHERE deleted_at IS NOT NULL
             ORDER BY deleted_at DESC, id DESC
             LIMIT ? OFFSET ?;"
        );
        let bind_values = vec![
            Value::Integer(i64::from(normalize_task_limit(limit))),
            Value::Integer(i64::from(offset)),
        ];
        query_tasks(self.conn, &sql, bind_values)
    }

    fn soft_delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_tasks
             SET deleted_at = ?2
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id, now_epoch_ms()],
        )?;
        if changed == 0 && self.lifecycle_of(id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "job task",
                id,
            });
        }
        self.committed("soft_delete", id);
        Ok(())
    }

    fn restore_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_tasks
             SET deleted_at = NULL
             WHERE id = ?1
               AND deleted_at IS NOT NULL;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "job task",
                id,
            });
        }
        self.committed("restore", id);
        Ok(())
    }

    fn destroy_task(&self, id: TaskId) -> RepoResult<()> {
        match self.lifecycle_of(id)? {
            None => {
                return Err(RepoError::NotFound {
                    entity: "job task",
                    id,
                })
            }
            Some(Lifecycle::Active) => {
                return Err(RepoError::NotDeleted {
                    entity: "job task",
                    id,
                })
            }
            Some(Lifecycle::Deleted { .. }) => {}
        }

        let changed = self.conn.execute(
            "DELETE FROM job_tasks WHERE id = ?1 AND deleted_at IS NOT NULL;",
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotDeleted {
                entity: "job task",
                id,
            });
        }
        self.committed("destroy", id);
        Ok(())
    }

    fn list_projects(&self) -> RepoResult<Vec<String>> {
        self.invalidator
            .project_cache()
            .get_or_try_insert_with(keys::PROJECT_LIST, self.ttl, || -> RepoResult<Vec<String>> {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT project
                     FROM job_tasks
                     WHERE deleted_at IS NULL
                     ORDER BY project ASC;",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let projects = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(projects)
            })
    }
}

/// Normalizes list limit according to the task listing contract.
pub fn normalize_task_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => TASKS_DEFAULT_LIMIT,
        Some(value) => value.min(TASKS_LIMIT_MAX),
    }
}

fn query_tasks(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<JobTask>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<JobTask> {
    let kind_text: String = row.get("type")?;
    let kind = parse_task_kind(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task type `{kind_text}` in job_tasks.type"))
    })?;
    let status_text: String = row.get("status")?;
    let status = parse_task_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task status `{status_text}` in job_tasks.status"
        ))
    })?;

    Ok(JobTask {
        id: row.get("id")?,
        job_no: row.get("job_no")?,
        project: row.get("project")?,
        kind,
        goal: row.get("goal")?,
        status,
        pass_accept_std: row.get("pass_accept_std")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        lifecycle: Lifecycle::from_deleted_at(row.get("deleted_at")?),
    })
}

fn build_list_filter(query: &TaskListQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(" WHERE deleted_at IS NULL");
    let mut bind_values = Vec::new();

    if let Some(project) = query.project.as_ref() {
        sql.push_str(" AND project = ?");
        bind_values.push(Value::Text(project.clone()));
    }
    if let Some(kind) = query.kind {
        sql.push_str(" AND type = ?");
        bind_values.push(Value::Text(task_kind_to_db(kind).to_string()));
    }
    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        bind_values.push(Value::Text(task_status_to_db(status).to_string()));
    }
    if let Some(from) = query.created_from {
        sql.push_str(" AND created_at >= ?");
        bind_values.push(Value::Integer(from));
    }
    if let Some(to) = query.created_to {
        sql.push_str(" AND created_at <= ?");
        bind_values.push(Value::Integer(to));
    }

    (sql, bind_values)
}
