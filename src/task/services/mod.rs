//! Application services for task orchestration and status reconciliation.

mod lifecycle;
mod sweeper;

pub use lifecycle::{
    CreateTaskRequest, SetTaskStatusRequest, SweepReport, TaskLifecycleError,
    TaskLifecycleResult, TaskLifecycleService, UpdateTaskRequest,
};
pub use sweeper::{ExpirySweeper, SweeperHandle};
