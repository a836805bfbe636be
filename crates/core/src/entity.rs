//! Entity trait: identity + continuity across state changes.

use uuid::Uuid;

/// Identifier type usable as an entity key.
///
/// The default value marks a *transient* entity: one that has not been assigned a key
/// by the store yet.
pub trait EntityId:
    Clone
    + Eq
    + Ord
    + core::hash::Hash
    + core::fmt::Debug
    + core::fmt::Display
    + Default
    + Send
    + Sync
    + 'static
{
    /// Key the store assigns to a new entity, given the highest key in use.
    ///
    /// `None` once the key space is exhausted.
    fn next_after(last: Option<&Self>) -> Option<Self>;

    fn is_transient(&self) -> bool {
        *self == Self::default()
    }
}

impl EntityId for Uuid {
    fn next_after(_last: Option<&Self>) -> Option<Self> {
        Some(Uuid::new_v4())
    }
}

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: EntityId;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// True until the store assigns an identifier.
    fn is_transient(&self) -> bool {
        self.id().is_transient()
    }
}

/// Identity comparison for entities.
///
/// The same instance is always equal. Two distinct transient entities are never equal;
/// otherwise entities are equal when their ids are.
pub fn same_identity<E: Entity + ?Sized>(left: &E, right: &E) -> bool {
    if core::ptr::addr_eq(left, right) {
        return true;
    }
    if left.is_transient() && right.is_transient() {
        return false;
    }
    left.id() == right.id()
}

/// Implements `PartialEq` for an [`Entity`] using [`same_identity`].
#[macro_export]
macro_rules! identity_semantics {
    ($t:ty) => {
        impl ::core::cmp::PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::entity::same_identity(self, other)
            }
        }
    };
}
