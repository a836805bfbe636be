//! Repository and unit-of-work contracts consumed by application code.
//!
//! Repository operations are deferred against the scope's data context: `add`,
//! `remove` and the `mark_*` calls only take effect when the owning
//! [`UnitOfWork`] commits.

use crate::aggregate::AggregateRoot;
use crate::error::DataResult;

/// Lazily evaluated query over loaded aggregates.
pub struct Query<E> {
    inner: Box<dyn Iterator<Item = E> + Send>,
}

impl<E: Send + 'static> Query<E> {
    pub fn new(items: impl IntoIterator<Item = E, IntoIter: Send + 'static>) -> Self {
        Self {
            inner: Box::new(items.into_iter()),
        }
    }

    /// Narrows the query; the predicate runs as items are pulled.
    pub fn filter_by(self, predicate: impl Fn(&E) -> bool + Send + 'static) -> Self {
        Self {
            inner: Box::new(self.inner.filter(move |item| predicate(item))),
        }
    }
}

impl<E> Iterator for Query<E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        self.inner.next()
    }
}

impl<E> core::fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}

/// Basic CRUD over one aggregate type.
///
/// `includes` name child paths to eager-load (see [`AggregateRoot::NAVIGATIONS`]).
pub trait Repository<E: AggregateRoot> {
    /// Finds an aggregate by key; `None` when absent.
    fn find_by_id(&self, id: &E::Id, includes: &[&str]) -> DataResult<Option<E>>;

    fn find_all(&self, includes: &[&str]) -> DataResult<Query<E>>;

    fn find_all_by<P>(&self, predicate: P, includes: &[&str]) -> DataResult<Query<E>>
    where
        P: Fn(&E) -> bool + Send + 'static;

    fn add(&self, entity: E) -> DataResult<()>;

    /// Deletes a stored aggregate on commit, or discards one added but not yet committed.
    fn remove(&self, entity: &E) -> DataResult<()>;

    /// Resolves the aggregate with [`Repository::find_by_id`] first.
    fn remove_by_id(&self, id: &E::Id) -> DataResult<()>;

    /// Flags a loaded aggregate as changed so the next commit writes it.
    fn mark_modified(&self, entity: &E) -> DataResult<()>;

    /// Drops pending changes recorded for the aggregate.
    fn mark_unmodified(&self, entity: &E) -> DataResult<()>;
}

/// Commit/undo boundary around the scope's data context.
pub trait UnitOfWork {
    /// Persists pending changes; with `reset_after_commit` the scope's context is
    /// discarded afterwards so later reads start fresh.
    fn commit(&self, reset_after_commit: bool) -> DataResult<()>;

    /// Discards the scope's context and every pending change in it.
    fn undo(&self) -> DataResult<()>;
}
