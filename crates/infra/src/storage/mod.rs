//! Scoped storage: one data context per logical scope.

pub mod container;
pub mod factory;
pub mod scope;

pub use container::{
    ContextStorage, RequestContextStorage, StorageKind, ThreadContextStorage, context_key,
};
pub use factory::StorageFactory;
pub use scope::{RequestScope, Scope, ScopeRegistry, SharedContext};
