//! Task status values and the status transition rules.
//!
//! The state machine is pure: it only looks at the current status, the
//! requested status, the deadline, the current time, and who is asking.
//! Persistence and concurrency are handled by the service layer.

use super::ParseTaskStatusError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Work is in progress and the deadline may still be met.
    Ongoing,
    /// The task was completed.
    Success,
    /// The task was abandoned or its deadline elapsed.
    Failure,
}

/// Who is requesting a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOrigin {
    /// An explicit user action such as "mark complete" or a board drag.
    Manual,
    /// The background expiry sweep.
    Automatic,
}

impl TransitionOrigin {
    /// Returns the canonical label used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl fmt::Display for TransitionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change refused by the state machine.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{origin} transition from {from} to {to} is not permitted")]
pub struct TransitionRejected {
    /// Status observed before the request.
    pub from: TaskStatus,
    /// Status that was requested.
    pub to: TaskStatus,
    /// Origin of the request.
    pub origin: TransitionOrigin,
}

impl TaskStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Ongoing, Self::Success, Self::Failure];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Returns `true` when automatic logic may never leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Decides the outcome of a requested status change.
    ///
    /// Manual requests are always accepted, including same-status no-ops and
    /// moves out of a terminal status. Automatic requests are accepted only
    /// for the expiry move `ongoing → failure`, and only once `now` has
    /// reached `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionRejected`] for any automatic request other than
    /// the expiry move.
    pub fn resolve_transition(
        self,
        requested: Self,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
        origin: TransitionOrigin,
    ) -> Result<Self, TransitionRejected> {
        match origin {
            TransitionOrigin::Manual => Ok(requested),
            TransitionOrigin::Automatic
                if self == Self::Ongoing && requested == Self::Failure && now >= deadline =>
            {
                Ok(requested)
            }
            TransitionOrigin::Automatic => Err(TransitionRejected {
                from: self,
                to: requested,
                origin,
            }),
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    /// Accepts only the exact lowercase wire names.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ongoing" => Ok(Self::Ongoing),
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
