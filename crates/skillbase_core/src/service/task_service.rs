//! Job task use-case service.
//!
//! # Responsibility
//! - Validate task input before persistence.
//! - Expose task lifecycle, listings and the distinct project list.
//!
//! # Invariants
//! - `job_no`, `project` and `goal` are required and stored trimmed.

use crate::model::task::{JobTask, NewJobTask, TaskId, TaskStatus};
use crate::repo::task_repo::{normalize_task_limit, TaskListQuery, TaskRepository};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for job task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    /// A required field is blank.
    MissingField(&'static str),
    TaskNotFound(TaskId),
    DuplicateJobNo(String),
    /// Permanent deletion of a task that is still live.
    NotDeleted(TaskId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "job task field `{field}` is required"),
            Self::TaskNotFound(id) => write!(f, "job task not found: {id}"),
            Self::DuplicateJobNo(job_no) => write!(f, "job number already exists: `{job_no}`"),
            Self::NotDeleted(id) => write!(f, "job task {id} is not in the recycle bin"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent job task state: {details}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::TaskNotFound(id),
            RepoError::NotDeleted { id, .. } => Self::NotDeleted(id),
            RepoError::Duplicate { value, .. } => Self::DuplicateJobNo(value),
            other => Self::Repo(other),
        }
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResult {
    pub items: Vec<JobTask>,
    pub total: u64,
    pub applied_limit: u32,
}

/// Job task service facade over repository implementations.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates and creates one task in `TaskStatus::Created`.
    pub fn create_task(&self, input: &NewJobTask) -> Result<JobTask, TaskServiceError> {
        let task = validate_new_task(input)?;
        let id = self.repo.create_task(&task)?;
        self.repo
            .get_task(id, false)?
            .ok_or(TaskServiceError::InconsistentState(
                "created job task not found in read-back",
            ))
    }

    pub fn get_task(&self, id: TaskId) -> Result<JobTask, TaskServiceError> {
        self.repo
            .get_task(id, false)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    pub fn update_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        pass_accept_std: bool,
    ) -> Result<JobTask, TaskServiceError> {
        self.repo.update_task_status(id, status, pass_accept_std)?;
        self.get_task(id)
    }

    pub fn list_tasks(&self, query: &TaskListQuery) -> Result<TaskListResult, TaskServiceError> {
        let applied_limit = normalize_task_limit(query.limit);
        let query = TaskListQuery {
            project: query
                .project
                .as_deref()
                .map(str::trim)
                .filter(|project| !project.is_empty())
                .map(str::to_string),
            limit: Some(applied_limit),
            ..query.clone()
        };
        Ok(TaskListResult {
            items: self.repo.list_tasks(&query)?,
            total: self.repo.count_tasks(&query)?,
            applied_limit,
        })
    }

    pub fn list_deleted_tasks(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<JobTask>, TaskServiceError> {
        Ok(self.repo.list_deleted_tasks(limit, offset)?)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<(), TaskServiceError> {
        self.repo.soft_delete_task(id)?;
        Ok(())
    }

    pub fn restore_task(&self, id: TaskId) -> Result<JobTask, TaskServiceError> {
        self.repo.restore_task(id)?;
        self.get_task(id)
    }

    pub fn destroy_task(&self, id: TaskId) -> Result<(), TaskServiceError> {
        self.repo.destroy_task(id)?;
        Ok(())
    }

    /// Distinct projects across live tasks.
    pub fn list_projects(&self) -> Result<Vec<String>, TaskServiceError> {
        Ok(self.repo.list_projects()?)
    }
}

/// Checks required fields and returns a trimmed copy of `input`.
pub fn validate_new_task(input: &NewJobTask) -> Result<NewJobTask, TaskServiceError> {
    let required = |value: &str, field: &'static str| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Err(TaskServiceError::MissingField(field))
        } else {
            Ok(trimmed.to_string())
        }
    };

    Ok(NewJobTask {
        job_no: required(&input.job_no, "job_no")?,
        project: required(&input.project, "project")?,
        kind: input.kind,
        goal: required(&input.goal, "goal")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{validate_new_task, TaskServiceError};
    use crate::model::task::{NewJobTask, TaskKind};

    fn input() -> NewJobTask {
        NewJobTask {
            job_no: " alpha-20250101-1 ".to_string(),
            project: "alpha".to_string(),
            kind: TaskKind::BugFix,
            goal: "fix login".to_string(),
        }
    }

    #[test]
    fn required_fields_are_trimmed() {
        let task = validate_new_task(&input()).unwrap();
        assert_eq!(task.job_no, "alpha-20250101-1");
    }

    #[test]
    fn blank_project_is_rejected() {
        let mut task = input();
        task.project = "  ".to_string();
        assert!(matches!(
            validate_new_task(&task),
            Err(TaskServiceError::MissingField("project"))
        ));
    }
}
