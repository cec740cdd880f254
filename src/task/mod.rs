//! Deadline-tracked tasks and their status reconciliation.
//!
//! Tasks carry a deadline and a lifecycle status. User actions change the
//! status directly; the expiry sweep fails `ongoing` tasks once their deadline
//! has passed. Both paths go through the same service and use conditional
//! writes, so a race between them leaves exactly one winner. The module
//! follows hexagonal architecture:
//!
//! - Domain types and the status state machine in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services and the sweeper in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
