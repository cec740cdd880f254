//! Port contracts for task persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod repository;

pub use repository::{
    StatusChange, TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult,
};
