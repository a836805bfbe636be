use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use nlayer_core::{AggregateRoot, DataError, DataResult, EntityState, Query, Repository};
use nlayer_model::{Person, PersonRepository};

use crate::data_context::{DataContext, DataContextFactory, EntitySet};
use crate::storage::Scope;

/// Repository over the data context of one scope.
///
/// Every operation resolves the scope's context, so repositories created in the same
/// scope share pending changes and commit together through the unit of work.
pub struct ContextRepository<E, C: DataContext> {
    contexts: DataContextFactory<C>,
    scope: Scope,
    _entity: PhantomData<fn() -> E>,
}

impl<E, C> ContextRepository<E, C>
where
    E: AggregateRoot,
    C: DataContext + EntitySet<E>,
{
    pub fn new(contexts: DataContextFactory<C>, scope: Scope) -> Self {
        Self {
            contexts,
            scope,
            _entity: PhantomData,
        }
    }

    pub fn context(&self) -> DataResult<Arc<C>> {
        self.contexts.get_data_context(&self.scope)
    }

    /// Rejects include paths that do not name a navigation of `E`.
    fn check_includes(includes: &[&str]) -> DataResult<()> {
        let unknown = includes
            .iter()
            .copied()
            .find(|path| !E::NAVIGATIONS.iter().any(|nav| nav == path));
        match unknown {
            Some(path) => Err(DataError::UnknownInclude {
                entity: type_name::<E>(),
                path: path.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl<E, C> Repository<E> for ContextRepository<E, C>
where
    E: AggregateRoot,
    C: DataContext + EntitySet<E>,
{
    fn find_by_id(&self, id: &E::Id, includes: &[&str]) -> DataResult<Option<E>> {
        Self::check_includes(includes)?;
        self.context()?.load(id)
    }

    fn find_all(&self, includes: &[&str]) -> DataResult<Query<E>> {
        Self::check_includes(includes)?;
        self.context()?.query()
    }

    fn find_all_by<P>(&self, predicate: P, includes: &[&str]) -> DataResult<Query<E>>
    where
        P: Fn(&E) -> bool + Send + 'static,
    {
        Ok(self.find_all(includes)?.filter_by(predicate))
    }

    fn add(&self, entity: E) -> DataResult<()> {
        self.context()?.insert(entity)
    }

    fn remove(&self, entity: &E) -> DataResult<()> {
        self.context()?.delete(entity)
    }

    fn remove_by_id(&self, id: &E::Id) -> DataResult<()> {
        let entity = self.find_by_id(id, &[])?.ok_or_else(|| {
            DataError::not_found(format!("{} {id}", type_name::<E>()))
        })?;
        self.remove(&entity)
    }

    fn mark_modified(&self, entity: &E) -> DataResult<()> {
        self.context()?.set_state(entity, EntityState::Modified)
    }

    fn mark_unmodified(&self, entity: &E) -> DataResult<()> {
        self.context()?.set_state(entity, EntityState::Unchanged)
    }
}

impl<C> PersonRepository for ContextRepository<Person, C>
where
    C: DataContext + EntitySet<Person>,
{
    fn find_by_last_name(&self, last_name: &str) -> DataResult<Vec<Person>> {
        let last_name = last_name.to_string();
        Ok(self
            .find_all_by(move |person| person.last_name == last_name, &[])?
            .collect())
    }
}

impl<E, C: DataContext> core::fmt::Debug for ContextRepository<E, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContextRepository")
            .field("entity", &type_name::<E>())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
