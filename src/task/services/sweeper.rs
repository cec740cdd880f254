//! Background reconciliation of task status against wall-clock time.
//!
//! [`ExpirySweeper`] periodically fails `ongoing` tasks whose deadline has
//! passed. It runs as one long-lived tokio task: ticks are handled one at a
//! time, so two sweeps never overlap, and ticks missed while a sweep was
//! running are skipped rather than queued.

use super::{SweepReport, TaskLifecycleResult, TaskLifecycleService};
use crate::config::SweeperConfig;
use crate::task::ports::TaskRepository;
use mockable::Clock;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodic expiry sweep over the task store.
pub struct ExpirySweeper<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    service: TaskLifecycleService<R, C>,
    config: SweeperConfig,
}

impl<R, C> ExpirySweeper<R, C>
where
    R: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a sweeper over the given service.
    #[must_use]
    pub const fn new(service: TaskLifecycleService<R, C>, config: SweeperConfig) -> Self {
        Self { service, config }
    }

    /// Returns the sweep cadence.
    #[must_use]
    pub const fn config(&self) -> SweeperConfig {
        self.config
    }

    /// Runs a single sweep cycle and reports how many tasks it failed.
    ///
    /// # Errors
    ///
    /// Returns the service error when the store is unavailable. The caller
    /// decides whether that ends anything; the background loop only logs it.
    pub async fn sweep_once(&self) -> TaskLifecycleResult<SweepReport> {
        self.service.expire_overdue_report().await
    }

    /// Starts the sweep loop on the current tokio runtime.
    ///
    /// The first cycle runs immediately, then once per configured interval
    /// until [`SweeperHandle::shutdown`] is called or the handle is dropped.
    #[must_use = "dropping the handle stops the sweeper"]
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(self.run(shutdown_rx));
        SweeperHandle { shutdown_tx, join }
    }

    async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval = ?self.config.interval(), "expiry sweeper started");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.run_cycle().await,
            }
        }

        info!("expiry sweeper stopped");
    }

    /// Runs one cycle inside the loop. Failures are logged and the loop
    /// carries on with the next tick.
    async fn run_cycle(&self) {
        match self.sweep_once().await {
            Ok(SweepReport { expired: 0, at }) => {
                debug!(%at, "expiry sweep found no overdue tasks");
            }
            Ok(SweepReport { expired, at }) => {
                info!(expired, %at, "expiry sweep failed overdue tasks");
            }
            Err(err) => warn!(error = %err, "expiry sweep cycle failed, retrying on next tick"),
        }
    }
}

/// Handle controlling a running sweep loop.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Returns `true` once the sweep loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stops issuing new ticks and waits for the loop to exit.
    ///
    /// A sweep already writing to the store is allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns a [`JoinError`] if the loop task panicked or was aborted.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        let Self { shutdown_tx, join } = self;
        if shutdown_tx.send(()).is_err() {
            debug!("expiry sweeper already stopped");
        }
        join.await
    }
}
