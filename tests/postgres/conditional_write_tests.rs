//! Status-guarded writes against `PostgreSQL`.

use crate::postgres::helpers::{
    BoxError, TestClock, base_instant, minutes_from_base, new_task, setup_repository,
};
use chrono::TimeDelta;
use deadline_tracker::task::{
    domain::{TaskDetails, TaskStatus, TransitionOrigin},
    ports::{StatusChange, TaskFilter, TaskRepository, TaskRepositoryError},
};

fn expire_at(offset: TimeDelta) -> (TaskFilter, StatusChange) {
    let now = base_instant() + offset;
    (
        TaskFilter::expirable_at(now),
        StatusChange {
            status: TaskStatus::Failure,
            updated_at: now,
        },
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn guarded_write_applies_when_status_matches() -> Result<(), BoxError> {
    let Some((_schema, repo)) = setup_repository().await? else {
        return Ok(());
    };
    let mut task = new_task("Draft roadmap", 60)?;
    repo.store(&task).await?;
    let clock = TestClock::new();
    clock.advance(TimeDelta::minutes(5));
    task.replace_details(TaskDetails::new("Draft 2027 roadmap", minutes_from_base(90))?, &clock);
    task.transition_to(TaskStatus::Success, TransitionOrigin::Manual, &clock)?;

    repo.update_where(&task, TaskStatus::Ongoing).await?;

    assert_eq!(repo.find_by_id(task.id()).await?, Some(task));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn guarded_write_after_sweep_is_stale() -> Result<(), BoxError> {
    let Some((_schema, repo)) = setup_repository().await? else {
        return Ok(());
    };
    let task = new_task("Renew certificate", -10)?;
    repo.store(&task).await?;
    let observed = repo
        .find_by_id(task.id())
        .await?
        .ok_or("stored task missing")?;

    let (filter, change) = expire_at(TimeDelta::seconds(1));
    let expired = repo.update_many_where(&filter, change).await?;

    let clock = TestClock::new();
    clock.advance(TimeDelta::seconds(2));
    let mut manual = observed.clone();
    manual.transition_to(TaskStatus::Success, TransitionOrigin::Manual, &clock)?;
    let result = repo.update_where(&manual, observed.status()).await;

    assert_eq!(expired, 1);
    assert!(
        matches!(
            result,
            Err(TaskRepositoryError::Stale {
                expected: TaskStatus::Ongoing,
                ..
            })
        ),
        "expected stale write, got {result:?}"
    );
    let stored = repo.find_by_id(task.id()).await?.ok_or("task vanished")?;
    assert_eq!(stored.status(), TaskStatus::Failure);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn status_write_keeps_concurrently_edited_fields() -> Result<(), BoxError> {
    let Some((_schema, repo)) = setup_repository().await? else {
        return Ok(());
    };
    let observed = new_task("Old title", 60)?;
    repo.store(&observed).await?;
    let clock = TestClock::new();
    clock.advance(TimeDelta::minutes(1));
    let mut edited = observed.clone();
    edited.replace_details(TaskDetails::new("New title", minutes_from_base(120))?, &clock);
    repo.update_where(&edited, TaskStatus::Ongoing).await?;

    let change = StatusChange {
        status: TaskStatus::Success,
        updated_at: base_instant() + TimeDelta::minutes(2),
    };
    let written = repo
        .update_status_where(observed.id(), observed.status(), change)
        .await?;

    assert_eq!(written.status(), TaskStatus::Success);
    assert_eq!(written.title().as_str(), "New title");
    assert_eq!(written.deadline(), minutes_from_base(120));
    assert_eq!(written.updated_at(), change.updated_at);
    assert_eq!(repo.find_by_id(observed.id()).await?, Some(written));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn status_write_after_sweep_is_stale() -> Result<(), BoxError> {
    let Some((_schema, repo)) = setup_repository().await? else {
        return Ok(());
    };
    let task = new_task("Renew domain", -10)?;
    repo.store(&task).await?;
    let (filter, expiry) = expire_at(TimeDelta::seconds(1));
    repo.update_many_where(&filter, expiry).await?;

    let change = StatusChange {
        status: TaskStatus::Success,
        updated_at: base_instant() + TimeDelta::seconds(2),
    };
    let result = repo
        .update_status_where(task.id(), TaskStatus::Ongoing, change)
        .await;
    let missing = repo
        .update_status_where(new_task("Ghost", 10)?.id(), TaskStatus::Ongoing, change)
        .await;

    assert!(
        matches!(result, Err(TaskRepositoryError::Stale { .. })),
        "expected stale write, got {result:?}"
    );
    assert!(matches!(missing, Err(TaskRepositoryError::NotFound(_))));
    let stored = repo.find_by_id(task.id()).await?.ok_or("task vanished")?;
    assert_eq!(stored.status(), TaskStatus::Failure);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn guarded_write_to_missing_task_is_not_found() -> Result<(), BoxError> {
    let Some((_schema, repo)) = setup_repository().await? else {
        return Ok(());
    };
    let task = new_task("Ghost", 10)?;

    let result = repo.update_where(&task, TaskStatus::Ongoing).await;

    assert!(matches!(result, Err(TaskRepositoryError::NotFound(id)) if id == task.id()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn bulk_expiry_is_selective_and_idempotent() -> Result<(), BoxError> {
    let Some((_schema, repo)) = setup_repository().await? else {
        return Ok(());
    };
    let overdue = new_task("Overdue", -10)?;
    let due_at_sweep = new_task("Due exactly now", 0)?;
    let upcoming = new_task("Upcoming", 10)?;
    let mut finished = new_task("Finished", -20)?;
    finished.transition_to(TaskStatus::Success, TransitionOrigin::Manual, &TestClock::new())?;
    for task in [&overdue, &due_at_sweep, &upcoming, &finished] {
        repo.store(task).await?;
    }

    let (filter, change) = expire_at(TimeDelta::zero());
    let first = repo.update_many_where(&filter, change).await?;
    let second = repo.update_many_where(&filter, change).await?;

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    let failed = repo
        .find(&TaskFilter::new().with_status(TaskStatus::Failure))
        .await?;
    assert_eq!(failed.len(), 1);
    let expired = failed.first().ok_or("expired task missing")?;
    assert_eq!(expired.id(), overdue.id());
    assert_eq!(expired.updated_at(), base_instant());
    assert_eq!(expired.created_at(), overdue.created_at());
    assert_eq!(repo.find_by_id(finished.id()).await?, Some(finished));
    assert_eq!(repo.find_by_id(due_at_sweep.id()).await?, Some(due_at_sweep));
    Ok(())
}
