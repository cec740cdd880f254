//! Shared test support: a settable clock, task builders, and a mock store.

use crate::task::{
    domain::{PersistedTaskData, Task, TaskId, TaskStatus, TaskTitle},
    ports::{StatusChange, TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use mockall::mock;
use std::sync::{Mutex, PoisonError};

mock! {
    pub Repository {}

    #[async_trait]
    impl TaskRepository for Repository {
        async fn store(&self, task: &Task) -> TaskRepositoryResult<()>;
        async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;
        async fn find(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;
        async fn update_where(
            &self,
            task: &Task,
            expected_status: TaskStatus,
        ) -> TaskRepositoryResult<()>;
        async fn update_status_where(
            &self,
            id: TaskId,
            expected_status: TaskStatus,
            change: StatusChange,
        ) -> TaskRepositoryResult<Task>;
        async fn update_many_where(
            &self,
            filter: &TaskFilter,
            change: StatusChange,
        ) -> TaskRepositoryResult<u64>;
        async fn delete(&self, id: TaskId) -> TaskRepositoryResult<Task>;
    }
}

/// Persistence error standing in for an unreachable database.
pub fn store_unavailable() -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other("connection refused"))
}

/// Clock returning a fixed instant until moved explicitly.
#[derive(Debug)]
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    /// Creates a clock frozen at `instant`.
    pub const fn at(instant: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(instant),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::at(base_instant())
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed reference instant used by the tests.
pub fn base_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Returns `base_instant()` shifted by `minutes`.
pub fn minutes_from_base(minutes: i64) -> DateTime<Utc> {
    base_instant() + TimeDelta::minutes(minutes)
}

/// Builds a task with an arbitrary status, created two hours before
/// `base_instant()`.
pub fn persisted_task(status: TaskStatus, deadline: DateTime<Utc>) -> Task {
    let created_at = base_instant() - TimeDelta::hours(2);
    Task::from_persisted(PersistedTaskData {
        id: TaskId::new(),
        title: TaskTitle::new("Persisted task").expect("static title is valid"),
        description: None,
        deadline,
        status,
        created_at,
        updated_at: created_at,
    })
}
