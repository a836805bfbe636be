use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use nlayer_core::{DataError, DataResult};

use super::container::{self, ContextStorage};
use super::scope::Scope;

static GLOBAL: Lazy<Arc<StorageFactory>> = Lazy::new(|| Arc::new(StorageFactory::new()));

/// Caches one context container per context type.
///
/// The container strategy (request or thread) is chosen from the scope passed on first
/// use of a type and kept for the factory's lifetime.
#[derive(Debug, Default)]
pub struct StorageFactory {
    containers: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl StorageFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide factory.
    pub fn global() -> Arc<StorageFactory> {
        Arc::clone(&GLOBAL)
    }

    /// The container for `T`, built on first use.
    ///
    /// Concurrent first calls race for the write lock; the first writer's container is
    /// kept and every caller gets it.
    pub fn container<T: Send + Sync + 'static>(
        &self,
        scope: &Scope,
    ) -> DataResult<Arc<dyn ContextStorage<T>>> {
        {
            let containers = self.containers.read().map_err(|_| poisoned())?;
            if let Some(existing) = containers.get(&TypeId::of::<T>()) {
                return unwrap_container::<T>(&**existing);
            }
        }

        let mut containers = self.containers.write().map_err(|_| poisoned())?;
        let entry = containers.entry(TypeId::of::<T>()).or_insert_with(|| {
            let created = container::for_scope::<T>(scope);
            tracing::debug!(
                context = type_name::<T>(),
                kind = ?created.kind(),
                "created context storage container"
            );
            let boxed: Box<dyn Any + Send + Sync> = Box::new(created);
            boxed
        });
        unwrap_container::<T>(&**entry)
    }

    /// Number of context types with a container.
    pub fn len(&self) -> usize {
        self.containers.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn unwrap_container<T: Send + Sync + 'static>(
    boxed: &(dyn Any + Send + Sync),
) -> DataResult<Arc<dyn ContextStorage<T>>> {
    boxed
        .downcast_ref::<Arc<dyn ContextStorage<T>>>()
        .map(Arc::clone)
        .ok_or_else(|| {
            DataError::storage(format!("container type mismatch for {}", type_name::<T>()))
        })
}

fn poisoned() -> DataError {
    DataError::storage("storage factory lock poisoned")
}
