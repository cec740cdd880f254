//! In-memory adapter implementations for testing and embedding.
//!
//! These adapters provide simple, thread-safe implementations suitable for
//! unit testing without database dependencies.

mod task;

pub use task::InMemoryTaskRepository;
