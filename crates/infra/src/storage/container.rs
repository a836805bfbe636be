//! Per-scope context containers: one strategy for request scopes, one for threads.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nlayer_core::{DataError, DataResult};

use super::scope::{RequestScope, Scope, SharedContext};

/// Which strategy a container uses to find its scope.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StorageKind {
    Request,
    Thread,
}

/// Holds at most one context of type `T` per scope.
pub trait ContextStorage<T>: Send + Sync {
    /// The scope's context, if one is stored.
    fn get(&self, scope: &Scope) -> DataResult<Option<Arc<T>>>;

    /// Stores the scope's context, replacing any previous one.
    fn store(&self, scope: &Scope, context: Arc<T>) -> DataResult<()>;

    /// Forgets the scope's context; the next read sees none.
    fn clear(&self, scope: &Scope) -> DataResult<()>;

    /// The scope's context, created with `create` when none is stored.
    fn get_or_create(
        &self,
        scope: &Scope,
        create: &mut dyn FnMut() -> DataResult<T>,
    ) -> DataResult<Arc<T>>;

    fn kind(&self) -> StorageKind;
}

/// Storage key of a context type: its qualified name plus `DataContext`.
pub fn context_key<T: ?Sized>() -> String {
    format!("{}DataContext", type_name::<T>())
}

fn downcast<T: Send + Sync + 'static>(context: SharedContext) -> DataResult<Arc<T>> {
    context.downcast::<T>().map_err(|_| {
        DataError::storage(format!(
            "stored context is not a {}",
            type_name::<T>()
        ))
    })
}

/// Keeps contexts in the request scope's registry.
#[derive(Debug)]
pub struct RequestContextStorage<T> {
    key: String,
    _context: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> RequestContextStorage<T> {
    pub fn new() -> Self {
        Self {
            key: context_key::<T>(),
            _context: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T: Send + Sync + 'static> Default for RequestContextStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn request_scope<T>(scope: &Scope) -> DataResult<&RequestScope> {
    match scope {
        Scope::Request(request) => Ok(request),
        Scope::Thread => Err(DataError::NoRequestScope(type_name::<T>())),
    }
}

impl<T: Send + Sync + 'static> ContextStorage<T> for RequestContextStorage<T> {
    fn get(&self, scope: &Scope) -> DataResult<Option<Arc<T>>> {
        let request = request_scope::<T>(scope)?;
        request
            .registry()
            .get(request.id(), &self.key)?
            .map(downcast::<T>)
            .transpose()
    }

    fn store(&self, scope: &Scope, context: Arc<T>) -> DataResult<()> {
        let request = request_scope::<T>(scope)?;
        request.registry().upsert(request.id(), &self.key, context)
    }

    fn clear(&self, scope: &Scope) -> DataResult<()> {
        let request = request_scope::<T>(scope)?;
        request.registry().clear_entry(request.id(), &self.key)
    }

    fn get_or_create(
        &self,
        scope: &Scope,
        create: &mut dyn FnMut() -> DataResult<T>,
    ) -> DataResult<Arc<T>> {
        let request = request_scope::<T>(scope)?;
        let context = request.registry().get_or_try_insert_with(request.id(), &self.key, || {
            tracing::debug!(key = %self.key, scope_id = %request.id(), "creating data context");
            let created: SharedContext = Arc::new(create()?);
            Ok(created)
        })?;
        downcast(context)
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Request
    }
}

static NEXT_THREAD_STORAGE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_SLOTS: RefCell<HashMap<(u64, String), Option<SharedContext>>> =
        RefCell::new(HashMap::new());
}

/// Keeps contexts in a per-thread map.
///
/// Each container owns a distinct region of the map, so separate factories never share
/// a thread's contexts. Dropping the container releases the dropping thread's context;
/// contexts it left in other threads live until those threads exit.
#[derive(Debug)]
pub struct ThreadContextStorage<T> {
    storage_id: u64,
    key: String,
    _context: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ThreadContextStorage<T> {
    pub fn new() -> Self {
        Self {
            storage_id: NEXT_THREAD_STORAGE.fetch_add(1, Ordering::Relaxed),
            key: context_key::<T>(),
            _context: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn slot_key(&self) -> (u64, String) {
        (self.storage_id, self.key.clone())
    }
}

impl<T> Drop for ThreadContextStorage<T> {
    fn drop(&mut self) {
        let slot_key = (self.storage_id, std::mem::take(&mut self.key));
        // Unavailable during thread teardown or a re-entrant borrow.
        let released = THREAD_SLOTS
            .try_with(|slots| {
                slots
                    .try_borrow_mut()
                    .ok()
                    .and_then(|mut slots| slots.remove(&slot_key))
            })
            .ok()
            .flatten();
        drop(released);
    }
}

impl<T: Send + Sync + 'static> Default for ThreadContextStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> ContextStorage<T> for ThreadContextStorage<T> {
    fn get(&self, _scope: &Scope) -> DataResult<Option<Arc<T>>> {
        THREAD_SLOTS
            .with_borrow(|slots| slots.get(&self.slot_key()).cloned().flatten())
            .map(downcast::<T>)
            .transpose()
    }

    fn store(&self, _scope: &Scope, context: Arc<T>) -> DataResult<()> {
        let context: SharedContext = context;
        THREAD_SLOTS.with_borrow_mut(|slots| {
            slots.insert(self.slot_key(), Some(context));
        });
        Ok(())
    }

    fn clear(&self, _scope: &Scope) -> DataResult<()> {
        THREAD_SLOTS.with_borrow_mut(|slots| {
            if let Some(slot) = slots.get_mut(&self.slot_key()) {
                *slot = None;
            }
        });
        Ok(())
    }

    fn get_or_create(
        &self,
        scope: &Scope,
        create: &mut dyn FnMut() -> DataResult<T>,
    ) -> DataResult<Arc<T>> {
        if let Some(existing) = self.get(scope)? {
            return Ok(existing);
        }

        tracing::debug!(key = %self.key, "creating thread-bound data context");
        let created = Arc::new(create()?);
        self.store(scope, Arc::clone(&created))?;
        Ok(created)
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Thread
    }
}

/// Builds the container for `T` matching the scope's kind.
pub(crate) fn for_scope<T: Send + Sync + 'static>(scope: &Scope) -> Arc<dyn ContextStorage<T>> {
    match scope {
        Scope::Request(_) => Arc::new(RequestContextStorage::<T>::new()),
        Scope::Thread => Arc::new(ThreadContextStorage::<T>::new()),
    }
}
