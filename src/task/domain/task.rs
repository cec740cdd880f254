//! Task aggregate root and its editable details.

use super::{TaskDescription, TaskDomainError, TaskId, TaskStatus, TaskTitle, TransitionOrigin};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// User-editable task fields.
///
/// Editing replaces all of them at once and never changes the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    title: TaskTitle,
    description: Option<TaskDescription>,
    deadline: DateTime<Utc>,
}

impl TaskDetails {
    /// Creates details with a required title and deadline.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskDomainError`] when the title is invalid.
    pub fn new(
        title: impl Into<String>,
        deadline: DateTime<Utc>,
    ) -> Result<Self, TaskDomainError> {
        Ok(Self {
            title: TaskTitle::new(title)?,
            description: None,
            deadline,
        })
    }

    /// Sets the description. A blank value clears it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::DescriptionTooLong`] when the description
    /// exceeds the maximum length.
    pub fn with_description(
        mut self,
        description: impl Into<String>,
    ) -> Result<Self, TaskDomainError> {
        self.description = TaskDescription::new(description)?;
        Ok(self)
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub const fn description(&self) -> Option<&TaskDescription> {
        self.description.as_ref()
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    title: TaskTitle,
    description: Option<TaskDescription>,
    deadline: DateTime<Utc>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: TaskTitle,
    /// Persisted description, if any.
    pub description: Option<TaskDescription>,
    /// Persisted deadline.
    pub deadline: DateTime<Utc>,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new `ongoing` task.
    #[must_use]
    pub fn new(details: TaskDetails, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let TaskDetails {
            title,
            description,
            deadline,
        } = details;

        Self {
            id: TaskId::new(),
            title,
            description,
            deadline,
            status: TaskStatus::Ongoing,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            deadline: data.deadline,
            status: data.status,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub const fn title(&self) -> &TaskTitle {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub const fn description(&self) -> Option<&TaskDescription> {
        self.description.as_ref()
    }

    /// Returns the deadline.
    #[must_use]
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest write timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when the task is still `ongoing` past its deadline and
    /// is waiting for the next expiry sweep.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Ongoing && self.deadline < now
    }

    /// Applies a status change after consulting the state machine.
    ///
    /// A same-status request leaves the task untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the state
    /// machine rejects the request; the task is not modified.
    pub fn transition_to(
        &mut self,
        requested: TaskStatus,
        origin: TransitionOrigin,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let now = clock.utc();
        let next = self
            .status
            .resolve_transition(requested, self.deadline, now, origin)
            .map_err(|rejection| TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: rejection.from,
                to: rejection.to,
                origin: rejection.origin,
            })?;

        if next != self.status {
            self.status = next;
            self.updated_at = now;
        }
        Ok(())
    }

    /// Replaces the editable details. The status is left as it is, even if
    /// the new deadline has already passed.
    pub fn replace_details(&mut self, details: TaskDetails, clock: &impl Clock) {
        self.title = details.title;
        self.description = details.description;
        self.deadline = details.deadline;
        self.touch(clock);
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
