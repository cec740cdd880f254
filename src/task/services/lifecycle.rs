//! Service layer for task creation, editing, and status changes.
//!
//! Every status-changing write passes through [`TaskLifecycleService`],
//! whether it comes from a user or from the expiry sweep. Writes are
//! conditional on the status observed when the task was read, so a
//! concurrent writer makes the later write fail with
//! [`TaskLifecycleError::Stale`] instead of overwriting the earlier result.

use crate::task::{
    domain::{
        ParseTaskStatusError, Task, TaskDetails, TaskDomainError, TaskId, TaskStatus,
        TransitionOrigin,
    },
    ports::{StatusChange, TaskFilter, TaskRepository, TaskRepositoryError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    description: Option<String>,
    deadline: DateTime<Utc>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            deadline,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request payload for replacing the editable fields of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    task_id: TaskId,
    title: String,
    description: Option<String>,
    deadline: DateTime<Utc>,
}

impl UpdateTaskRequest {
    /// Creates a request replacing title and deadline and clearing the
    /// description.
    #[must_use]
    pub fn new(task_id: TaskId, title: impl Into<String>, deadline: DateTime<Utc>) -> Self {
        Self {
            task_id,
            title: title.into(),
            description: None,
            deadline,
        }
    }

    /// Sets the replacement description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Outcome of one expiry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of tasks moved from `ongoing` to `failure`.
    pub expired: u64,
    /// Clock reading the pass compared deadlines against.
    pub at: DateTime<Utc>,
}

/// Request payload for changing a task status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetTaskStatusRequest {
    task_id: TaskId,
    status: String,
    origin: TransitionOrigin,
}

impl SetTaskStatusRequest {
    /// Creates a manual status change request.
    ///
    /// The status is parsed by the service so unrecognised values surface as
    /// [`TaskLifecycleError::InvalidStatus`].
    #[must_use]
    pub fn new(task_id: TaskId, status: impl Into<String>) -> Self {
        Self {
            task_id,
            status: status.into(),
            origin: TransitionOrigin::Manual,
        }
    }

    /// Marks the request as coming from automatic logic.
    #[must_use]
    pub const fn automatic(mut self) -> Self {
        self.origin = TransitionOrigin::Automatic;
        self
    }

    /// Returns the request origin.
    #[must_use]
    pub const fn origin(&self) -> TransitionOrigin {
        self.origin
    }
}

/// Service-level errors for task operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// Field validation failed or the state machine refused a transition.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// The requested status is not a recognised value.
    #[error(transparent)]
    InvalidStatus(#[from] ParseTaskStatusError),

    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// Another writer changed the task between read and write.
    #[error("task {task_id} changed concurrently; status is no longer {expected}")]
    Stale {
        /// Task that was written concurrently.
        task_id: TaskId,
        /// Status observed before the write.
        expected: TaskStatus,
    },

    /// The record store failed or is unavailable.
    #[error(transparent)]
    Repository(TaskRepositoryError),
}

impl TaskLifecycleError {
    /// Returns `true` when the write lost a race and may be retried after
    /// re-reading the task.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Returns `true` when the task does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` when the state machine refused the transition.
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            Self::Domain(TaskDomainError::InvalidStatusTransition { .. })
        )
    }
}

impl From<TaskRepositoryError> for TaskLifecycleError {
    fn from(err: TaskRepositoryError) -> Self {
        match err {
            TaskRepositoryError::NotFound(task_id) => Self::NotFound(task_id),
            TaskRepositoryError::Stale { task_id, expected } => Self::Stale { task_id, expected },
            other => Self::Repository(other),
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task orchestration service shared by the API layer and the sweeper.
pub struct TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> Clone for TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R, C> TaskLifecycleService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates and stores a new `ongoing` task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] when a field is invalid, or a
    /// repository error when persistence fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let details = build_details(request.title, request.description, request.deadline)?;
        let task = Task::new(details, &*self.clock);
        self.repository.store(&task).await?;
        debug!(task_id = %task.id(), deadline = %task.deadline(), "task created");
        Ok(task)
    }

    /// Retrieves a task by identifier.
    ///
    /// Returns `Ok(None)` when the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the lookup fails.
    pub async fn find_by_id(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.repository.find_by_id(task_id).await?)
    }

    /// Lists tasks matching `filter`, soonest deadline first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the query fails.
    pub async fn list_tasks(&self, filter: TaskFilter) -> TaskLifecycleResult<Vec<Task>> {
        Ok(self.repository.find(&filter).await?)
    }

    /// Replaces title, description, and deadline. The status is not touched
    /// and is not re-derived from the new deadline.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Domain`] for invalid fields,
    /// [`TaskLifecycleError::NotFound`] when the task is missing or deleted
    /// concurrently, and [`TaskLifecycleError::Stale`] when its status changed
    /// between read and write.
    pub async fn update_task(&self, request: UpdateTaskRequest) -> TaskLifecycleResult<Task> {
        let details = build_details(request.title, request.description, request.deadline)?;
        let mut task = self.load(request.task_id).await?;
        let observed = task.status();

        task.replace_details(details, &*self.clock);
        self.repository.update_where(&task, observed).await?;
        debug!(task_id = %task.id(), "task details replaced");
        Ok(task)
    }

    /// Deletes a task and returns the removed record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] when the task does not exist.
    pub async fn delete_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let removed = self.repository.delete(task_id).await?;
        debug!(task_id = %task_id, "task deleted");
        Ok(removed)
    }

    /// Changes the status of a task after consulting the state machine.
    ///
    /// The write only lands if the stored status still equals the status read
    /// at the start of the call, and it touches only status and `updated_at`,
    /// so a concurrent field edit is kept. Returns the task as stored. A
    /// same-status manual request returns the task without writing. The
    /// service never retries.
    ///
    /// # Errors
    ///
    /// - [`TaskLifecycleError::InvalidStatus`] for an unrecognised status.
    /// - [`TaskLifecycleError::NotFound`] when the task does not exist.
    /// - [`TaskLifecycleError::Domain`] with
    ///   [`TaskDomainError::InvalidStatusTransition`] when the state machine
    ///   refuses the move; nothing is written.
    /// - [`TaskLifecycleError::Stale`] when a concurrent writer won.
    pub async fn set_status(&self, request: SetTaskStatusRequest) -> TaskLifecycleResult<Task> {
        let SetTaskStatusRequest {
            task_id,
            status,
            origin,
        } = request;
        let requested = TaskStatus::try_from(status.as_str())?;
        let mut task = self.load(task_id).await?;
        let observed = task.status();

        task.transition_to(requested, origin, &*self.clock)
            .inspect_err(|err| debug!(task_id = %task_id, error = %err, "status change refused"))?;
        if task.status() == observed {
            return Ok(task);
        }

        let change = StatusChange {
            status: task.status(),
            updated_at: task.updated_at(),
        };
        let stored = self
            .repository
            .update_status_where(task_id, observed, change)
            .await
            .inspect_err(|err| debug!(task_id = %task_id, error = %err, "status write failed"))?;
        info!(
            task_id = %task_id,
            from = %observed,
            to = %stored.status(),
            origin = %origin,
            "task status changed"
        );
        Ok(stored)
    }

    /// Fails every `ongoing` task whose deadline is before the current time.
    ///
    /// Issues one bulk conditional update so the store, not this process,
    /// decides which records still match at write time. Returns the number of
    /// tasks transitioned; a repeated call with no time change returns zero.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the store fails.
    pub async fn expire_overdue(&self) -> TaskLifecycleResult<u64> {
        Ok(self.expire_overdue_report().await?.expired)
    }

    /// Runs [`Self::expire_overdue`] and also reports the instant used as the
    /// expiry cut-off and as the written `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Repository`] when the store fails.
    pub async fn expire_overdue_report(&self) -> TaskLifecycleResult<SweepReport> {
        let now = self.clock.utc();
        let change = StatusChange {
            status: TaskStatus::Failure,
            updated_at: now,
        };
        let expired = self
            .repository
            .update_many_where(&TaskFilter::expirable_at(now), change)
            .await?;
        Ok(SweepReport { expired, at: now })
    }

    async fn load(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }
}

fn build_details(
    title: String,
    description: Option<String>,
    deadline: DateTime<Utc>,
) -> Result<TaskDetails, TaskDomainError> {
    let details = TaskDetails::new(title, deadline)?;
    let Some(text) = description else {
        return Ok(details);
    };
    details.with_description(text)
}
