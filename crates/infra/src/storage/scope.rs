//! Logical scopes and the registry of per-scope context slots.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use nlayer_core::{DataError, DataResult, ScopeId};

/// A cached context instance, type-erased.
pub type SharedContext = Arc<dyn Any + Send + Sync>;

/// A slot holds the scope's context, or nothing after a clear.
type Slot = Option<SharedContext>;

/// Scope-isolated slots for request-bound contexts.
///
/// Slots are keyed by `(scope id, context key)`, so two scopes never observe each
/// other's contexts.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    slots: RwLock<HashMap<(ScopeId, String), Slot>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope_id: ScopeId, key: &str) -> DataResult<Option<SharedContext>> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        Ok(slots
            .get(&(scope_id, key.to_string()))
            .and_then(Clone::clone))
    }

    /// Inserts or overwrites the slot.
    pub fn upsert(&self, scope_id: ScopeId, key: &str, context: SharedContext) -> DataResult<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        slots.insert((scope_id, key.to_string()), Some(context));
        Ok(())
    }

    /// Empties an existing slot; the key itself stays registered.
    pub fn clear_entry(&self, scope_id: ScopeId, key: &str) -> DataResult<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        if let Some(slot) = slots.get_mut(&(scope_id, key.to_string())) {
            *slot = None;
        }
        Ok(())
    }

    /// Returns the slot's context, creating and storing one if the slot is empty.
    ///
    /// `create` runs without holding the registry lock, so a slow or panicking
    /// constructor never blocks or poisons other scopes. When callers in one scope race,
    /// the first stored instance wins and every caller receives it.
    pub fn get_or_try_insert_with(
        &self,
        scope_id: ScopeId,
        key: &str,
        create: impl FnOnce() -> DataResult<SharedContext>,
    ) -> DataResult<SharedContext> {
        if let Some(existing) = self.get(scope_id, key)? {
            return Ok(existing);
        }

        let created = create()?;
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        let slot = slots.entry((scope_id, key.to_string())).or_default();
        Ok(Arc::clone(slot.get_or_insert(created)))
    }

    /// Drops every slot of a scope.
    pub fn end(&self, scope_id: ScopeId) -> DataResult<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        slots.retain(|(id, _key), _slot| *id != scope_id);
        Ok(())
    }

    /// Registered keys of a scope, including cleared ones.
    pub fn keys(&self, scope_id: ScopeId) -> DataResult<Vec<String>> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        let mut keys: Vec<String> = slots
            .keys()
            .filter(|(id, _key)| *id == scope_id)
            .map(|(_id, key)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    pub fn len(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> DataError {
    DataError::storage("scope registry lock poisoned")
}

/// Releases a scope's slots when the last handle goes away.
#[derive(Debug)]
struct ScopeGuard {
    id: ScopeId,
    registry: Arc<ScopeRegistry>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if let Err(err) = self.registry.end(self.id) {
            tracing::warn!(scope_id = %self.id, error = %err, "failed to release request scope");
        }
    }
}

/// One request-bound scope over a shared registry.
///
/// Clones are cheap handles to the same scope. The scope's contexts are released by
/// [`end`](Self::end) or, at the latest, when the last handle is dropped, so early
/// returns and panics do not leak them.
#[derive(Debug, Clone)]
pub struct RequestScope {
    guard: Arc<ScopeGuard>,
}

impl RequestScope {
    pub fn begin(registry: Arc<ScopeRegistry>) -> Self {
        Self::with_id(ScopeId::new(), registry)
    }

    pub fn with_id(id: ScopeId, registry: Arc<ScopeRegistry>) -> Self {
        Self {
            guard: Arc::new(ScopeGuard { id, registry }),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.guard.id
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.guard.registry
    }

    /// Ends the scope now and releases every context cached in it.
    pub fn end(self) -> DataResult<()> {
        tracing::debug!(scope_id = %self.id(), "ending request scope");
        self.registry().end(self.id())
    }
}

/// The logical scope a data context is cached for.
#[derive(Debug, Clone)]
pub enum Scope {
    /// Bound to an inbound request (or job) and its registry.
    Request(RequestScope),
    /// Bound to the calling thread.
    Thread,
}

impl Scope {
    pub fn request(scope: &RequestScope) -> Self {
        Self::Request(scope.clone())
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}

impl From<RequestScope> for Scope {
    fn from(scope: RequestScope) -> Self {
        Self::Request(scope)
    }
}
