//! Domain model for deadline-tracked tasks.
//!
//! The domain covers the task aggregate, its validated fields, and the status
//! state machine. Persistence, scheduling, and concurrency control live
//! outside this boundary.

mod error;
mod fields;
mod ids;
mod status;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use fields::{MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH, TaskDescription, TaskTitle};
pub use ids::TaskId;
pub use status::{TaskStatus, TransitionOrigin, TransitionRejected};
pub use task::{PersistedTaskData, Task, TaskDetails};
