//! Deadline tracker: tasks whose status follows wall-clock time.
//!
//! This crate keeps task lifecycle status consistent with task deadlines. A
//! periodic expiry sweep fails `ongoing` tasks once their deadline has
//! passed, while users keep changing statuses directly. Both kinds of writes
//! go through one service and are conditional on the status they observed,
//! so races resolve to exactly one winner without in-process locks.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (in-memory, `PostgreSQL`)
//!
//! # Modules
//!
//! - [`task`]: Task model, status state machine, service, and expiry sweeper
//! - [`config`]: Sweeper cadence and process configuration
//! - [`telemetry`]: Structured logging setup

pub mod config;
pub mod task;
pub mod telemetry;
