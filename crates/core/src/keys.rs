//! Store-wide key sequences.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::EntityId;
use crate::error::{DataError, DataResult};

/// Hands out store-assigned keys, one sequence per key type.
///
/// Sequences are shared by every aggregate in a store, so two children of different
/// roots never receive the same key. A sequence only moves forward: keys seen through
/// [`observe`](Self::observe) or issued by [`next`](Self::next) are never issued again.
#[derive(Debug, Clone, Default)]
pub struct KeyAllocator {
    last: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest key issued or observed for `K`.
    pub fn last<K: EntityId>(&self) -> Option<&K> {
        self.last
            .get(&TypeId::of::<K>())
            .and_then(|key| key.downcast_ref::<K>())
    }

    /// Records a key assigned outside the sequence.
    pub fn observe<K: EntityId>(&mut self, key: &K) {
        if key.is_transient() || self.last::<K>().is_some_and(|last| last >= key) {
            return;
        }
        self.last.insert(TypeId::of::<K>(), Arc::new(key.clone()));
    }

    /// Next key of `K`'s sequence.
    pub fn next<K: EntityId>(&mut self) -> DataResult<K> {
        let key = K::next_after(self.last::<K>()).ok_or_else(|| {
            DataError::storage(format!("key space of {} is exhausted", type_name::<K>()))
        })?;
        self.last.insert(TypeId::of::<K>(), Arc::new(key.clone()));
        Ok(key)
    }
}
