//! Runs the task expiry sweeper against a `PostgreSQL` task store.
//!
//! Usage:
//!
//! ```text
//! deadline_sweeper --database-url postgres://localhost/tasks [--sweep-interval-secs 60]
//! ```
//!
//! Every flag also reads from the environment (`DATABASE_URL`,
//! `SWEEP_INTERVAL_SECS`, `DATABASE_POOL_SIZE`,
//! `DATABASE_CONNECT_TIMEOUT_SECS`, `LOG_FILTER`). The sweeper starts at
//! launch and stops on Ctrl-C, letting an in-flight sweep finish.

use clap::Parser;
use deadline_tracker::config::AppConfig;
use deadline_tracker::task::{
    adapters::postgres::{PostgresTaskRepository, TaskPgPool},
    services::{ExpirySweeper, TaskLifecycleService},
};
use deadline_tracker::telemetry;
use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use mockable::DefaultClock;
use std::sync::Arc;
use tracing::{error, info};

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::parse();
    telemetry::init(config.log_filter.as_deref())?;

    let sweeper_config = config.sweeper()?;
    let pool = build_pool(&config)?;
    let service = TaskLifecycleService::new(
        Arc::new(PostgresTaskRepository::new(pool)),
        Arc::new(DefaultClock),
    );
    let handle = ExpirySweeper::new(service, sweeper_config).spawn();

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
    info!("shutdown requested");
    handle.shutdown().await?;
    Ok(())
}

/// Builds the connection pool lazily so a database outage at launch only
/// fails individual sweep cycles.
fn build_pool(config: &AppConfig) -> Result<TaskPgPool, BoxError> {
    let manager = ConnectionManager::<PgConnection>::new(config.database_url.as_str());
    let pool = TaskPgPool::builder()
        .max_size(config.pool_size()?)
        .connection_timeout(config.connect_timeout())
        .build_unchecked(manager);
    Ok(pool)
}
