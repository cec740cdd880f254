//! `PostgreSQL` repository implementation for task storage.
//!
//! Conditional writes put the observed status in the `WHERE` clause of a
//! single `UPDATE`, so the database resolves races between the expiry sweep
//! and user-driven changes.

use super::{
    models::{NewTaskRow, TaskChangeset, TaskRow},
    schema::tasks,
};
use crate::task::{
    domain::{PersistedTaskData, Task, TaskDescription, TaskId, TaskStatus, TaskTitle},
    ports::{StatusChange, TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{Nullable, Text, Timestamptz};

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let new_row = to_new_row(task);

        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskRepositoryError::DuplicateTask(task_id)
                    }
                    _ => TaskRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let criteria = *filter;
        self.run_blocking(move |connection| {
            let query = diesel::sql_query(concat!(
                "SELECT id, title, description, deadline, status, created_at, updated_at ",
                "FROM tasks ",
                "WHERE ($1::text IS NULL OR status = $1) ",
                "AND ($2::timestamptz IS NULL OR deadline < $2) ",
                "AND ($3::timestamptz IS NULL OR deadline >= $3) ",
                "ORDER BY deadline ASC, created_at ASC, id ASC",
            ))
            .bind::<Nullable<Text>, _>(criteria.status().map(TaskStatus::as_str))
            .bind::<Nullable<Timestamptz>, _>(criteria.deadline_before())
            .bind::<Nullable<Timestamptz>, _>(criteria.deadline_not_before());

            let rows = query
                .load::<TaskRow>(connection)
                .map_err(TaskRepositoryError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn update_where(
        &self,
        task: &Task,
        expected_status: TaskStatus,
    ) -> TaskRepositoryResult<()> {
        let task_id = task.id();
        let changeset = to_changeset(task);

        self.run_blocking(move |connection| {
            let written = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(task_id.into_inner()))
                    .filter(tasks::status.eq(expected_status.as_str())),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(TaskRepositoryError::persistence)?;

            if written > 0 {
                return Ok(());
            }
            Err(unmatched_write(connection, task_id, expected_status))
        })
        .await
    }

    async fn update_status_where(
        &self,
        id: TaskId,
        expected_status: TaskStatus,
        change: StatusChange,
    ) -> TaskRepositoryResult<Task> {
        self.run_blocking(move |connection| {
            let row = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.into_inner()))
                    .filter(tasks::status.eq(expected_status.as_str())),
            )
            .set((
                tasks::status.eq(change.status.as_str()),
                tasks::updated_at.eq(change.updated_at),
            ))
            .returning(TaskRow::as_returning())
            .get_result::<TaskRow>(connection)
            .optional()
            .map_err(TaskRepositoryError::persistence)?;

            match row {
                Some(written) => row_to_task(written),
                None => Err(unmatched_write(connection, id, expected_status)),
            }
        })
        .await
    }

    async fn update_many_where(
        &self,
        filter: &TaskFilter,
        change: StatusChange,
    ) -> TaskRepositoryResult<u64> {
        let criteria = *filter;
        self.run_blocking(move |connection| {
            let written = diesel::sql_query(concat!(
                "UPDATE tasks SET status = $1, updated_at = $2 ",
                "WHERE ($3::text IS NULL OR status = $3) ",
                "AND ($4::timestamptz IS NULL OR deadline < $4) ",
                "AND ($5::timestamptz IS NULL OR deadline >= $5)",
            ))
            .bind::<Text, _>(change.status.as_str())
            .bind::<Timestamptz, _>(change.updated_at)
            .bind::<Nullable<Text>, _>(criteria.status().map(TaskStatus::as_str))
            .bind::<Nullable<Timestamptz>, _>(criteria.deadline_before())
            .bind::<Nullable<Timestamptz>, _>(criteria.deadline_not_before())
            .execute(connection)
            .map_err(TaskRepositoryError::persistence)?;

            u64::try_from(written).map_err(TaskRepositoryError::persistence)
        })
        .await
    }

    async fn delete(&self, id: TaskId) -> TaskRepositoryResult<Task> {
        self.run_blocking(move |connection| {
            let row = diesel::delete(tasks::table.filter(tasks::id.eq(id.into_inner())))
                .returning(TaskRow::as_returning())
                .get_result::<TaskRow>(connection)
                .optional()
                .map_err(TaskRepositoryError::persistence)?;
            row.ok_or(TaskRepositoryError::NotFound(id))
                .and_then(row_to_task)
        })
        .await
    }
}

/// Explains a conditional write that matched no row: a concurrent delete
/// reports `NotFound`, a lost race reports `Stale`.
fn unmatched_write(
    connection: &mut PgConnection,
    task_id: TaskId,
    expected_status: TaskStatus,
) -> TaskRepositoryError {
    let lookup = tasks::table
        .filter(tasks::id.eq(task_id.into_inner()))
        .select(tasks::id)
        .first::<uuid::Uuid>(connection)
        .optional();

    match lookup {
        Ok(Some(_)) => TaskRepositoryError::Stale {
            task_id,
            expected: expected_status,
        },
        Ok(None) => TaskRepositoryError::NotFound(task_id),
        Err(err) => TaskRepositoryError::persistence(err),
    }
}

fn to_new_row(task: &Task) -> NewTaskRow {
    NewTaskRow {
        id: task.id().into_inner(),
        title: task.title().as_str().to_owned(),
        description: task.description().map(|value| value.as_str().to_owned()),
        deadline: task.deadline(),
        status: task.status().as_str().to_owned(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    }
}

fn to_changeset(task: &Task) -> TaskChangeset {
    TaskChangeset {
        title: task.title().as_str().to_owned(),
        description: task.description().map(|value| value.as_str().to_owned()),
        deadline: task.deadline(),
        status: task.status().as_str().to_owned(),
        updated_at: task.updated_at(),
    }
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let TaskRow {
        id,
        title: persisted_title,
        description: persisted_description,
        deadline,
        status: persisted_status,
        created_at,
        updated_at,
    } = row;

    let title = TaskTitle::new(persisted_title).map_err(TaskRepositoryError::persistence)?;
    let description = persisted_description
        .map(TaskDescription::new)
        .transpose()
        .map_err(TaskRepositoryError::persistence)?
        .flatten();
    let status = TaskStatus::try_from(persisted_status.as_str())
        .map_err(TaskRepositoryError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(id),
        title,
        description,
        deadline,
        status,
        created_at,
        updated_at,
    }))
}
