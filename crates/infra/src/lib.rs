//! Infrastructure layer: scoped context storage, the storage port and its in-memory
//! adapter, units of work and repositories.

pub mod data_context;
pub mod memory;
pub mod repository;
pub mod storage;
pub mod unit_of_work;

pub use data_context::{DataContext, DataContextFactory, EntitySet};
pub use memory::{InMemoryContext, MemoryDatabase};
pub use repository::ContextRepository;
pub use storage::{RequestScope, Scope, ScopeRegistry, StorageFactory};
pub use unit_of_work::{ScopedUnitOfWork, UnitOfWorkFactory};
