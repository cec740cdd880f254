//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus, TransitionOrigin};
use thiserror::Error;

/// Errors returned while constructing or mutating domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the maximum length.
    #[error("task title has {length} characters, maximum is {max}")]
    TitleTooLong {
        /// Length of the trimmed title in characters.
        length: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// The task description exceeds the maximum length.
    #[error("task description has {length} characters, maximum is {max}")]
    DescriptionTooLong {
        /// Length of the trimmed description in characters.
        length: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// A present description is blank. Absent descriptions are `None`.
    #[error("task description must not be blank when present")]
    BlankDescription,

    /// The state machine refused the requested status change.
    #[error("invalid {origin} status transition for task {task_id}: {from} -> {to}")]
    InvalidStatusTransition {
        /// Task whose status change was refused.
        task_id: TaskId,
        /// Status observed before the request.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
        /// Origin of the request.
        origin: TransitionOrigin,
    },
}

/// Error returned while parsing task statuses from requests or persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
