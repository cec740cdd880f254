//! Repository port for task persistence and conditional status writes.

use crate::task::domain::{Task, TaskId, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Selection criteria for task queries and bulk updates.
///
/// Unset criteria match every task. All set criteria must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    status: Option<TaskStatus>,
    deadline_before: Option<DateTime<Utc>>,
    deadline_not_before: Option<DateTime<Utc>>,
}

impl TaskFilter {
    /// Creates a filter matching every task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the tasks the expiry sweep may fail at `now`: still `ongoing`
    /// with a deadline strictly before `now`.
    ///
    /// Every task matched here is one for which an automatic
    /// `ongoing → failure` request is accepted by the state machine.
    #[must_use]
    pub const fn expirable_at(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Ongoing),
            deadline_before: Some(now),
            deadline_not_before: None,
        }
    }

    /// Restricts the filter to a single status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts the filter to deadlines strictly before `instant`.
    #[must_use]
    pub const fn with_deadline_before(mut self, instant: DateTime<Utc>) -> Self {
        self.deadline_before = Some(instant);
        self
    }

    /// Restricts the filter to deadlines at or after `instant`.
    #[must_use]
    pub const fn with_deadline_not_before(mut self, instant: DateTime<Utc>) -> Self {
        self.deadline_not_before = Some(instant);
        self
    }

    /// Returns the status criterion.
    #[must_use]
    pub const fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    /// Returns the exclusive deadline upper bound.
    #[must_use]
    pub const fn deadline_before(&self) -> Option<DateTime<Utc>> {
        self.deadline_before
    }

    /// Returns the inclusive deadline lower bound.
    #[must_use]
    pub const fn deadline_not_before(&self) -> Option<DateTime<Utc>> {
        self.deadline_not_before
    }

    /// Returns `true` when `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status() == status)
            && self
                .deadline_before
                .is_none_or(|instant| task.deadline() < instant)
            && self
                .deadline_not_before
                .is_none_or(|instant| task.deadline() >= instant)
    }
}

/// Status write applied by a status-only conditional update, to one task or
/// to every task matched by a bulk update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Status to write.
    pub status: TaskStatus,
    /// Write timestamp recorded as `updated_at`.
    pub updated_at: DateTime<Utc>,
}

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateTask`] when the task ID already
    /// exists.
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Returns every task matching `filter`, soonest deadline first.
    async fn find(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Overwrites a stored task only if its stored status still equals
    /// `expected_status`.
    ///
    /// Writes every editable field, so it suits whole-record edits. Status
    /// changes go through [`TaskRepository::update_status_where`] instead.
    /// The check and the write happen atomically per record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::Stale`] when another writer changed its
    /// status first.
    async fn update_where(
        &self,
        task: &Task,
        expected_status: TaskStatus,
    ) -> TaskRepositoryResult<()>;

    /// Writes only `change` (status and `updated_at`) to one task, and only
    /// if its stored status still equals `expected_status`. Returns the task
    /// as stored after the write.
    ///
    /// Title, description, and deadline are left as stored, so a concurrent
    /// edit of those fields survives.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist
    /// and [`TaskRepositoryError::Stale`] when another writer changed its
    /// status first.
    async fn update_status_where(
        &self,
        id: TaskId,
        expected_status: TaskStatus,
        change: StatusChange,
    ) -> TaskRepositoryResult<Task>;

    /// Applies `change` to every task matching `filter` and returns the number
    /// of tasks written.
    ///
    /// The filter is evaluated by the store at write time, so a task changed
    /// concurrently so that it no longer matches is left alone.
    async fn update_many_where(
        &self,
        filter: &TaskFilter,
        change: StatusChange,
    ) -> TaskRepositoryResult<u64>;

    /// Deletes a task and returns the removed record.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task does not exist.
    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<Task>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// A conditional write lost a race: the stored status no longer matched.
    #[error("stale write for task {task_id}: status is no longer {expected}")]
    Stale {
        /// Task that was written concurrently.
        task_id: TaskId,
        /// Status the writer observed before writing.
        expected: TaskStatus,
    },

    /// Persistence-layer failure, such as an unreachable store or a timeout.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
