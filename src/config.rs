//! Runtime configuration for the expiry sweeper and its host process.
//!
//! [`SweeperConfig`] is the library-level setting consumed by
//! [`crate::task::services::ExpirySweeper`]. [`AppConfig`] is the process
//! configuration parsed from command-line flags and environment variables by
//! the `deadline_sweeper` binary.

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// Default sweep cadence: once per minute.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Errors raised while building configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The sweep interval must be greater than zero.
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,

    /// The connection pool must hold at least one connection.
    #[error("database pool size must be greater than zero")]
    ZeroPoolSize,
}

/// Cadence settings for the expiry sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    interval: Duration,
}

impl SweeperConfig {
    /// Creates a sweeper configuration with the given cadence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroSweepInterval`] when `interval` is zero.
    pub const fn new(interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(Self { interval })
    }

    /// Returns the time between two sweep cycles.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Process configuration for the sweeper binary.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about = "Fails overdue ongoing tasks on a fixed cadence")]
pub struct AppConfig {
    /// `PostgreSQL` connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Seconds between two sweep cycles.
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 4)]
    pub pool_size: u32,

    /// Seconds to wait for a pooled connection before a store call fails.
    #[arg(long, env = "DATABASE_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Log filter directive, for example `info` or `deadline_tracker=debug`.
    ///
    /// Falls back to `RUST_LOG`, then to `info`.
    #[arg(long, env = "LOG_FILTER")]
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Builds the sweeper cadence from the process settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroSweepInterval`] when the interval is zero.
    pub const fn sweeper(&self) -> Result<SweeperConfig, ConfigError> {
        SweeperConfig::new(Duration::from_secs(self.sweep_interval_secs))
    }

    /// Returns the validated connection pool size.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroPoolSize`] when the pool size is zero.
    pub const fn pool_size(&self) -> Result<u32, ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        Ok(self.pool_size)
    }

    /// Returns the connection checkout timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
