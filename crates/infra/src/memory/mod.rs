//! In-memory adapter for the storage port, for tests and development.

pub mod context;
pub mod database;

pub use context::InMemoryContext;
pub use database::{MemoryDatabase, Tables};
