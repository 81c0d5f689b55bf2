//! Job task domain model.
//!
//! Only the fields that feed the distinct-project listing and the recycle bin
//! live here; execution history is owned by the transport layer.

use crate::model::lifecycle::Lifecycle;
use serde::{Deserialize, Serialize};

pub type TaskId = i64;

/// Work category of a job task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    NewFeature,
    BugFix,
    Improvement,
    Refactoring,
    UnitTest,
    IntegrationTest,
}

/// Completion stage of a job task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Processing,
    Failed,
    Completed,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTask {
    pub id: TaskId,
    /// Unique `project-date-sequence` style number.
    pub job_no: String,
    pub project: String,
    pub kind: TaskKind,
    pub goal: String,
    pub status: TaskStatus,
    pub pass_accept_std: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub lifecycle: Lifecycle,
}

/// Input model for task creation. New tasks start in `TaskStatus::Created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobTask {
    pub job_no: String,
    pub project: String,
    pub kind: TaskKind,
    pub goal: String,
}

pub(crate) fn task_kind_to_db(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::NewFeature => "new_feature",
        TaskKind::BugFix => "bug_fix",
        TaskKind::Improvement => "improvement",
        TaskKind::Refactoring => "refactoring",
        TaskKind::UnitTest => "unit_test",
        TaskKind::IntegrationTest => "integration_test",
    }
}

pub(crate) fn parse_task_kind(value: &str) -> Option<TaskKind> {
    match value {
        "new_feature" => Some(TaskKind::NewFeature),
        "bug_fix" => Some(TaskKind::BugFix),
        "improvement" => Some(TaskKind::Improvement),
        "refactoring" => Some(TaskKind::Refactoring),
        "unit_test" => Some(TaskKind::UnitTest),
        "integration_test" => Some(TaskKind::IntegrationTest),
        _ => None,
    }
}

pub(crate) fn task_status_to_db(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Created => "created",
        TaskStatus::Processing => "processing",
        TaskStatus::Failed => "failed",
        TaskStatus::Completed => "completed",
        TaskStatus::Accepted => "accepted",
    }
}

pub(crate) fn parse_task_status(value: &str) -> Option<TaskStatus> {
    match value {
        "created" => Some(TaskStatus::Created),
        "processing" => Some(TaskStatus::Processing),
        "failed" => Some(TaskStatus::Failed),
        "completed" => Some(TaskStatus::Completed),
        "accepted" => Some(TaskStatus::Accepted),
        _ => None,
    }
}
