//! Storage port: what the repository and unit of work need from a data context.

use std::sync::Arc;

use nlayer_core::{AggregateRoot, DataResult, EntityState, Query};

use crate::storage::{Scope, StorageFactory};

/// A change-tracking session over a store.
///
/// Contexts are shared by every repository in a scope, so all operations take `&self`.
pub trait DataContext: Send + Sync + 'static {
    /// Builds a context with its default configuration.
    fn create() -> DataResult<Self>
    where
        Self: Sized;

    /// Writes every pending change; returns the number of entities written.
    fn save_changes(&self) -> DataResult<usize>;

    fn has_changes(&self) -> bool;
}

/// Access to the aggregates of one type inside a data context.
pub trait EntitySet<E: AggregateRoot> {
    /// Loads a stored aggregate by key.
    fn load(&self, id: &E::Id) -> DataResult<Option<E>>;

    /// All stored aggregates, in key order.
    fn query(&self) -> DataResult<Query<E>>;

    /// Tracks a new aggregate for insertion.
    fn insert(&self, entity: E) -> DataResult<()>;

    /// Tracks an aggregate for deletion.
    ///
    /// A transient aggregate instead drops its pending insert; `NotFound` when it has
    /// none.
    fn delete(&self, entity: &E) -> DataResult<()>;

    /// Overrides the tracked state of an aggregate, using `entity` as its current value.
    fn set_state(&self, entity: &E, state: EntityState) -> DataResult<()>;
}

type Constructor<C> = Arc<dyn Fn() -> DataResult<C> + Send + Sync>;

/// Hands out the data context of the current scope.
pub struct DataContextFactory<C> {
    storage: Arc<StorageFactory>,
    constructor: Constructor<C>,
}

impl<C: DataContext> DataContextFactory<C> {
    /// Uses [`DataContext::create`] to build new contexts.
    pub fn new(storage: Arc<StorageFactory>) -> Self {
        Self::with_constructor(storage, C::create)
    }

    pub fn with_constructor(
        storage: Arc<StorageFactory>,
        constructor: impl Fn() -> DataResult<C> + Send + Sync + 'static,
    ) -> Self {
        Self {
            storage,
            constructor: Arc::new(constructor),
        }
    }

    /// The scope's context; constructed and cached on first use.
    ///
    /// Construction errors are returned as-is and nothing is cached.
    pub fn get_data_context(&self, scope: &Scope) -> DataResult<Arc<C>> {
        let container = self.storage.container::<C>(scope)?;
        container.get_or_create(scope, &mut || (self.constructor)())
    }

    /// The scope's context if one is cached; never constructs.
    pub fn current(&self, scope: &Scope) -> DataResult<Option<Arc<C>>> {
        self.storage.container::<C>(scope)?.get(scope)
    }

    /// Drops the scope's context so the next request builds a fresh one.
    pub fn clear(&self, scope: &Scope) -> DataResult<()> {
        tracing::debug!(context = std::any::type_name::<C>(), "clearing data context");
        self.storage.container::<C>(scope)?.clear(scope)
    }

    pub fn storage(&self) -> &Arc<StorageFactory> {
        &self.storage
    }
}

impl<C> Clone for DataContextFactory<C> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            constructor: Arc::clone(&self.constructor),
        }
    }
}

impl<C> core::fmt::Debug for DataContextFactory<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataContextFactory")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nlayer_core::DataError;

    use super::*;
    use crate::storage::{RequestScope, ScopeRegistry};

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    #[derive(Debug)]
    struct CountingContext {
        serial: usize,
    }

    impl DataContext for CountingContext {
        fn create() -> DataResult<Self> {
            Ok(Self {
                serial: CREATED.fetch_add(1, Ordering::SeqCst),
            })
        }

        fn save_changes(&self) -> DataResult<usize> {
            Ok(0)
        }

        fn has_changes(&self) -> bool {
            false
        }
    }

    #[derive(Debug)]
    struct Unreachable;

    impl DataContext for Unreachable {
        fn create() -> DataResult<Self> {
            Err(DataError::construction("store unreachable"))
        }

        fn save_changes(&self) -> DataResult<usize> {
            Ok(0)
        }

        fn has_changes(&self) -> bool {
            false
        }
    }

    fn request_scope(registry: &Arc<ScopeRegistry>) -> Scope {
        Scope::from(RequestScope::begin(Arc::clone(registry)))
    }

    #[test]
    fn consecutive_calls_return_the_same_context() {
        let contexts = DataContextFactory::<CountingContext>::new(Arc::new(StorageFactory::new()));
        let scope = request_scope(&Arc::new(ScopeRegistry::new()));

        let first = contexts.get_data_context(&scope).unwrap();
        let second = contexts.get_data_context(&scope).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn clear_yields_a_new_context() {
        let contexts = DataContextFactory::<CountingContext>::new(Arc::new(StorageFactory::new()));
        let scope = request_scope(&Arc::new(ScopeRegistry::new()));

        let first = contexts.get_data_context(&scope).unwrap();
        contexts.clear(&scope).unwrap();
        assert!(contexts.current(&scope).unwrap().is_none());

        let second = contexts.get_data_context(&scope).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.serial > first.serial);
    }

    #[test]
    fn clear_only_affects_the_current_scope() {
        let contexts = DataContextFactory::<CountingContext>::new(Arc::new(StorageFactory::new()));
        let registry = Arc::new(ScopeRegistry::new());
        let (a, b) = (request_scope(&registry), request_scope(&registry));

        let in_b = contexts.get_data_context(&b).unwrap();
        contexts.get_data_context(&a).unwrap();
        contexts.clear(&a).unwrap();

        let still_b = contexts.current(&b).unwrap().unwrap();
        assert!(Arc::ptr_eq(&in_b, &still_b));
    }

    #[test]
    fn thread_scoped_clear_yields_a_new_context() {
        let contexts = DataContextFactory::<CountingContext>::new(Arc::new(StorageFactory::new()));

        let first = contexts.get_data_context(&Scope::Thread).unwrap();
        contexts.clear(&Scope::Thread).unwrap();
        assert!(contexts.current(&Scope::Thread).unwrap().is_none());

        let second = contexts.get_data_context(&Scope::Thread).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn thread_scoped_clear_does_not_reach_other_threads() {
        let contexts = DataContextFactory::<CountingContext>::new(Arc::new(StorageFactory::new()));
        let barrier = Arc::new(Barrier::new(2));

        let worker = {
            let contexts = contexts.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let before = contexts.get_data_context(&Scope::Thread).unwrap();
                barrier.wait();
                barrier.wait();
                let after = contexts.current(&Scope::Thread).unwrap();
                after.is_some_and(|after| Arc::ptr_eq(&before, &after))
            })
        };

        contexts.get_data_context(&Scope::Thread).unwrap();
        barrier.wait();
        contexts.clear(&Scope::Thread).unwrap();
        barrier.wait();

        assert!(worker.join().unwrap());
        assert!(contexts.current(&Scope::Thread).unwrap().is_none());
    }

    #[test]
    fn construction_failure_propagates() {
        let contexts = DataContextFactory::<Unreachable>::new(Arc::new(StorageFactory::new()));
        let scope = request_scope(&Arc::new(ScopeRegistry::new()));

        let err = contexts.get_data_context(&scope).unwrap_err();

        assert_eq!(err, DataError::construction("store unreachable"));
        assert!(contexts.current(&scope).unwrap().is_none());
    }

    #[test]
    fn custom_constructor_is_used() {
        let contexts = DataContextFactory::with_constructor(Arc::new(StorageFactory::new()), || {
            Ok(CountingContext { serial: 999 })
        });

        let context = contexts.get_data_context(&Scope::Thread).unwrap();
        assert_eq!(context.serial, 999);
    }
}
