//! Conditional-write races between user requests and the expiry sweep.

use std::sync::Arc;

use super::helpers::{GatedRepository, TestClock, minutes_from_base};
use chrono::TimeDelta;
use deadline_tracker::task::{
    domain::{Task, TaskStatus},
    services::{
        CreateTaskRequest, SetTaskStatusRequest, TaskLifecycleError, TaskLifecycleService,
        UpdateTaskRequest,
    },
};
use eyre::eyre;

type GatedService = TaskLifecycleService<GatedRepository, TestClock>;

struct Race {
    service: GatedService,
    reached: tokio::sync::oneshot::Receiver<()>,
    release: tokio::sync::oneshot::Sender<()>,
    task: Task,
}

/// Builds a service over a gated store holding one `ongoing` task due
/// `due_minutes` from the base instant, with the clock one second later.
async fn race_on_task_due(due_minutes: i64) -> eyre::Result<Race> {
    let (repository, control) = GatedRepository::with_gate();
    let clock = Arc::new(TestClock::new());
    let service = TaskLifecycleService::new(Arc::new(repository), Arc::clone(&clock));
    let task = service
        .create_task(CreateTaskRequest::new(
            "Submit grant report",
            minutes_from_base(due_minutes),
        ))
        .await?;
    clock.advance(TimeDelta::seconds(1));
    Ok(Race {
        service,
        reached: control.reached,
        release: control.release,
        task,
    })
}

async fn overdue_race() -> eyre::Result<Race> {
    race_on_task_due(-10).await
}

async fn current_status(service: &GatedService, task: &Task) -> eyre::Result<TaskStatus> {
    let stored = service
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre!("task {} vanished", task.id()))?;
    Ok(stored.status())
}

#[tokio::test(flavor = "multi_thread")]
async fn manual_write_loses_to_sweep_that_landed_first() -> eyre::Result<()> {
    let Race {
        service,
        reached,
        release,
        task,
    } = overdue_race().await?;

    let manual = {
        let manual_service = service.clone();
        let request = SetTaskStatusRequest::new(task.id(), "success");
        tokio::spawn(async move { manual_service.set_status(request).await })
    };
    reached.await?;

    let expired = service.expire_overdue().await?;
    release
        .send(())
        .map_err(|()| eyre!("manual writer stopped waiting"))?;
    let outcome = manual.await?;

    eyre::ensure!(expired == 1);
    eyre::ensure!(
        matches!(
            &outcome,
            Err(TaskLifecycleError::Stale {
                expected: TaskStatus::Ongoing,
                ..
            })
        ),
        "expected stale write, got {outcome:?}"
    );
    eyre::ensure!(current_status(&service, &task).await? == TaskStatus::Failure);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn edit_racing_sweep_does_not_revive_task() -> eyre::Result<()> {
    let Race {
        service,
        reached,
        release,
        task,
    } = overdue_race().await?;

    let edit = {
        let edit_service = service.clone();
        let request =
            UpdateTaskRequest::new(task.id(), "Submit grant report", minutes_from_base(60));
        tokio::spawn(async move { edit_service.update_task(request).await })
    };
    reached.await?;

    service.expire_overdue().await?;
    release
        .send(())
        .map_err(|()| eyre!("editor stopped waiting"))?;
    let outcome = edit.await?;

    eyre::ensure!(
        matches!(&outcome, Err(err) if err.is_stale()),
        "expected stale write, got {outcome:?}"
    );
    let stored = service
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre!("task vanished"))?;
    eyre::ensure!(stored.status() == TaskStatus::Failure);
    eyre::ensure!(stored.deadline() == minutes_from_base(-10));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sweep_skips_task_completed_first() -> eyre::Result<()> {
    let Race {
        service,
        reached,
        release,
        task,
    } = overdue_race().await?;

    let manual = {
        let manual_service = service.clone();
        let request = SetTaskStatusRequest::new(task.id(), "success");
        tokio::spawn(async move { manual_service.set_status(request).await })
    };
    reached.await?;
    release
        .send(())
        .map_err(|()| eyre!("manual writer stopped waiting"))?;
    let completed = manual.await??;

    let expired = service.expire_overdue().await?;

    eyre::ensure!(completed.status() == TaskStatus::Success);
    eyre::ensure!(expired == 0);
    eyre::ensure!(current_status(&service, &task).await? == TaskStatus::Success);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn status_change_keeps_edit_made_after_its_read() -> eyre::Result<()> {
    let Race {
        service,
        reached,
        release,
        task,
    } = race_on_task_due(60).await?;

    let manual = {
        let manual_service = service.clone();
        let request = SetTaskStatusRequest::new(task.id(), "success");
        tokio::spawn(async move { manual_service.set_status(request).await })
    };
    reached.await?;

    let edited = service
        .update_task(UpdateTaskRequest::new(
            task.id(),
            "Submit final grant report",
            minutes_from_base(120),
        ))
        .await?;
    release
        .send(())
        .map_err(|()| eyre!("manual writer stopped waiting"))?;
    let completed = manual.await??;

    let stored = service
        .find_by_id(task.id())
        .await?
        .ok_or_else(|| eyre!("task vanished"))?;
    eyre::ensure!(stored == completed);
    eyre::ensure!(stored.status() == TaskStatus::Success);
    eyre::ensure!(stored.title() == edited.title());
    eyre::ensure!(stored.deadline() == minutes_from_base(120));
    Ok(())
}
