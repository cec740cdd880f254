//! In-memory task repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::task::{
    domain::{PersistedTaskData, Task, TaskId, TaskStatus},
    ports::{StatusChange, TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
///
/// Every conditional write runs under one write lock, so the status check
/// and the write are atomic with respect to other callers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(err: &PoisonError<T>) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Orders tasks by deadline, then creation time, then identifier so listings
/// are stable.
fn sort_by_deadline(tasks: &mut [Task]) {
    tasks.sort_by(|left, right| {
        left.deadline()
            .cmp(&right.deadline())
            .then_with(|| left.created_at().cmp(&right.created_at()))
            .then_with(|| left.id().into_inner().cmp(&right.id().into_inner()))
    });
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut tasks = self.state.write().map_err(|err| poisoned(&err))?;
        if tasks.contains_key(&task.id()) {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let tasks = self.state.read().map_err(|err| poisoned(&err))?;
        Ok(tasks.get(&id).cloned())
    }

    async fn find(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let tasks = self.state.read().map_err(|err| poisoned(&err))?;
        let mut matched: Vec<Task> = tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        sort_by_deadline(&mut matched);
        Ok(matched)
    }

    async fn update_where(
        &self,
        task: &Task,
        expected_status: TaskStatus,
    ) -> TaskRepositoryResult<()> {
        let mut tasks = self.state.write().map_err(|err| poisoned(&err))?;
        let stored = tasks
            .get_mut(&task.id())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;

        if stored.status() != expected_status {
            return Err(TaskRepositoryError::Stale {
                task_id: task.id(),
                expected: expected_status,
            });
        }

        *stored = task.clone();
        Ok(())
    }

    async fn update_status_where(
        &self,
        id: TaskId,
        expected_status: TaskStatus,
        change: StatusChange,
    ) -> TaskRepositoryResult<Task> {
        let mut tasks = self.state.write().map_err(|err| poisoned(&err))?;
        let stored = tasks.get_mut(&id).ok_or(TaskRepositoryError::NotFound(id))?;

        if stored.status() != expected_status {
            return Err(TaskRepositoryError::Stale {
                task_id: id,
                expected: expected_status,
            });
        }

        *stored = with_status(stored, change);
        Ok(stored.clone())
    }

    async fn update_many_where(
        &self,
        filter: &TaskFilter,
        change: StatusChange,
    ) -> TaskRepositoryResult<u64> {
        let mut tasks = self.state.write().map_err(|err| poisoned(&err))?;
        let mut written = 0_u64;
        for stored in tasks.values_mut().filter(|task| filter.matches(task)) {
            *stored = with_status(stored, change);
            written += 1;
        }
        Ok(written)
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<Task> {
        let mut tasks = self.state.write().map_err(|err| poisoned(&err))?;
        tasks.remove(&id).ok_or(TaskRepositoryError::NotFound(id))
    }
}

/// Rebuilds a stored task with a status change applied, mirroring a
/// column-level `UPDATE` in a relational store.
fn with_status(task: &Task, change: StatusChange) -> Task {
    Task::from_persisted(PersistedTaskData {
        id: task.id(),
        title: task.title().clone(),
        description: task.description().cloned(),
        deadline: task.deadline(),
        status: change.status,
        created_at: task.created_at(),
        updated_at: change.updated_at,
    })
}
