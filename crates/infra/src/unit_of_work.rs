use std::sync::Arc;

use nlayer_core::{DataResult, UnitOfWork};

use crate::data_context::{DataContext, DataContextFactory};
use crate::storage::Scope;

/// Unit of work bound to one scope's data context.
///
/// Dropping it never saves: pending changes stay in the scope's context until a later
/// commit or undo.
pub struct ScopedUnitOfWork<C: DataContext> {
    contexts: DataContextFactory<C>,
    scope: Scope,
}

impl<C: DataContext> ScopedUnitOfWork<C> {
    /// Starts a unit of work; with `force_new` the scope's context is replaced first.
    pub fn new(contexts: DataContextFactory<C>, scope: Scope, force_new: bool) -> DataResult<Self> {
        if force_new {
            contexts.clear(&scope)?;
        }
        contexts.get_data_context(&scope)?;
        Ok(Self { contexts, scope })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn context(&self) -> DataResult<Arc<C>> {
        self.contexts.get_data_context(&self.scope)
    }
}

impl<C: DataContext> UnitOfWork for ScopedUnitOfWork<C> {
    fn commit(&self, reset_after_commit: bool) -> DataResult<()> {
        let written = self.context()?.save_changes()?;
        tracing::debug!(written, reset_after_commit, "unit of work committed");
        if reset_after_commit {
            self.contexts.clear(&self.scope)?;
        }
        Ok(())
    }

    fn undo(&self) -> DataResult<()> {
        tracing::debug!("unit of work undone");
        self.contexts.clear(&self.scope)
    }
}

impl<C: DataContext> Drop for ScopedUnitOfWork<C> {
    fn drop(&mut self) {
        if let Ok(Some(context)) = self.contexts.current(&self.scope) {
            if context.has_changes() {
                tracing::warn!(
                    context = std::any::type_name::<C>(),
                    "unit of work dropped with uncommitted changes"
                );
            }
        }
    }
}

impl<C: DataContext> core::fmt::Debug for ScopedUnitOfWork<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopedUnitOfWork")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Creates units of work over one context factory.
pub struct UnitOfWorkFactory<C: DataContext> {
    contexts: DataContextFactory<C>,
}

impl<C: DataContext> UnitOfWorkFactory<C> {
    pub fn new(contexts: DataContextFactory<C>) -> Self {
        Self { contexts }
    }

    /// Joins the scope's current context, creating it if needed.
    pub fn create(&self, scope: &Scope) -> DataResult<ScopedUnitOfWork<C>> {
        self.create_with(scope, false)
    }

    pub fn create_with(&self, scope: &Scope, force_new: bool) -> DataResult<ScopedUnitOfWork<C>> {
        ScopedUnitOfWork::new(self.contexts.clone(), scope.clone(), force_new)
    }
}

impl<C: DataContext> Clone for UnitOfWorkFactory<C> {
    fn clone(&self) -> Self {
        Self {
            contexts: self.contexts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use nlayer_core::DataError;
    use nlayer_model::{Person, PersonType};

    use super::*;
    use crate::data_context::EntitySet;
    use crate::memory::{InMemoryContext, MemoryDatabase};
    use crate::storage::{RequestScope, ScopeRegistry, StorageFactory};

    fn factory(database: &Arc<MemoryDatabase>) -> UnitOfWorkFactory<InMemoryContext> {
        let database = Arc::clone(database);
        UnitOfWorkFactory::new(DataContextFactory::with_constructor(
            Arc::new(StorageFactory::new()),
            move || Ok(InMemoryContext::new(Arc::clone(&database))),
        ))
    }

    fn scope() -> Scope {
        Scope::from(RequestScope::begin(Arc::new(ScopeRegistry::new())))
    }

    #[test]
    fn units_of_work_in_a_scope_share_the_context() {
        let units = factory(&Arc::new(MemoryDatabase::new()));
        let scope = scope();

        let first = units.create(&scope).unwrap();
        let second = units.create(&scope).unwrap();

        assert!(Arc::ptr_eq(&first.context().unwrap(), &second.context().unwrap()));
    }

    #[test]
    fn force_new_replaces_the_context() {
        let units = factory(&Arc::new(MemoryDatabase::new()));
        let scope = scope();

        let first = units.create(&scope).unwrap().context().unwrap();
        let second = units.create_with(&scope, true).unwrap().context().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn commit_persists_and_optionally_resets() {
        let database = Arc::new(MemoryDatabase::new());
        let units = factory(&database);
        let scope = scope();
        let uow = units.create(&scope).unwrap();
        let before = uow.context().unwrap();
        before.insert(Person::new("Imar", "Spaanjaars", PersonType::Friend)).unwrap();

        uow.commit(true).unwrap();

        assert_eq!(database.count::<Person>().unwrap(), 1);
        assert!(!Arc::ptr_eq(&before, &uow.context().unwrap()));
    }

    #[test]
    fn commit_without_reset_keeps_the_context() {
        let units = factory(&Arc::new(MemoryDatabase::new()));
        let uow = units.create(&scope()).unwrap();
        let before = uow.context().unwrap();

        uow.commit(false).unwrap();

        assert!(Arc::ptr_eq(&before, &uow.context().unwrap()));
    }

    #[test]
    fn undo_discards_pending_changes() {
        let database = Arc::new(MemoryDatabase::new());
        let units = factory(&database);
        let uow = units.create(&scope()).unwrap();
        uow.context()
            .unwrap()
            .insert(Person::new("Imar", "Spaanjaars", PersonType::Friend))
            .unwrap();

        uow.undo().unwrap();
        uow.commit(false).unwrap();

        assert_eq!(database.count::<Person>().unwrap(), 0);
    }

    #[test]
    fn dropping_does_not_save() {
        let database = Arc::new(MemoryDatabase::new());
        let units = factory(&database);
        let scope = scope();
        {
            let uow = units.create(&scope).unwrap();
            uow.context()
                .unwrap()
                .insert(Person::new("Imar", "Spaanjaars", PersonType::Friend))
                .unwrap();
        }

        assert_eq!(database.count::<Person>().unwrap(), 0);
        let context = units.create(&scope).unwrap().context().unwrap();
        assert!(context.has_changes());
    }

    #[test]
    fn failed_commit_keeps_the_context_and_its_changes() {
        let units = factory(&Arc::new(MemoryDatabase::new()));
        let uow = units.create(&scope()).unwrap();
        let context = uow.context().unwrap();
        context.insert(Person::default()).unwrap();

        let err = uow.commit(true).unwrap_err();

        assert!(matches!(err, DataError::Validation(_)));
        assert!(Arc::ptr_eq(&context, &uow.context().unwrap()));
        assert!(context.has_changes());
    }
}
