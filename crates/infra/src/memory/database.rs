use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use nlayer_core::{AggregateRoot, DataError, DataResult, KeyAllocator};

static SHARED: Lazy<Arc<MemoryDatabase>> = Lazy::new(|| Arc::new(MemoryDatabase::new()));

/// One key-ordered table per aggregate type, plus the store's key sequences.
#[derive(Default)]
pub struct Tables {
    inner: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    keys: KeyAllocator,
}

impl Tables {
    pub fn table<E: AggregateRoot>(&self) -> DataResult<Option<&BTreeMap<E::Id, E>>> {
        self.inner
            .get(&TypeId::of::<E>())
            .map(|table| {
                table
                    .downcast_ref::<BTreeMap<E::Id, E>>()
                    .ok_or_else(mismatch::<E>)
            })
            .transpose()
    }

    pub fn table_mut<E: AggregateRoot>(&mut self) -> DataResult<&mut BTreeMap<E::Id, E>> {
        self.inner
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                let table: Box<dyn Any + Send + Sync> = Box::new(BTreeMap::<E::Id, E>::new());
                table
            })
            .downcast_mut::<BTreeMap<E::Id, E>>()
            .ok_or_else(mismatch::<E>)
    }

    pub fn get<E: AggregateRoot>(&self, id: &E::Id) -> DataResult<Option<&E>> {
        Ok(self.table::<E>()?.and_then(|table| table.get(id)))
    }

    /// Key sequences shared by every table.
    pub fn keys(&self) -> &KeyAllocator {
        &self.keys
    }

    pub fn set_keys(&mut self, keys: KeyAllocator) {
        self.keys = keys;
    }
}

impl core::fmt::Debug for Tables {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tables")
            .field("tables", &self.inner.len())
            .field("keys", &self.keys)
            .finish()
    }
}

fn mismatch<E>() -> DataError {
    DataError::storage(format!("table type mismatch for {}", type_name::<E>()))
}

/// In-memory committed state shared by every [`InMemoryContext`](super::InMemoryContext)
/// built over it.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide database used by [`DataContext::create`](crate::DataContext::create).
    pub fn shared() -> Arc<MemoryDatabase> {
        Arc::clone(&SHARED)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> DataResult<R>) -> DataResult<R> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        f(&tables)
    }

    /// Runs `f` with exclusive access to every table.
    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> DataResult<R>) -> DataResult<R> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        f(&mut tables)
    }

    /// Number of stored aggregates of type `E`.
    pub fn count<E: AggregateRoot>(&self) -> DataResult<usize> {
        self.read(|tables| Ok(tables.table::<E>()?.map_or(0, BTreeMap::len)))
    }
}

fn poisoned() -> DataError {
    DataError::storage("memory database lock poisoned")
}
