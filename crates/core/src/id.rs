//! Strongly-typed identifiers.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a logical scope (one inbound request, one background job).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(Uuid);

impl ScopeId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ScopeId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for ScopeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Declares a store-assigned integer entity identifier.
///
/// `0` is the transient value; the store hands out `max + 1` on insert and never a
/// key below `1`.
#[macro_export]
macro_rules! int_entity_id {
    ($t:ident, $name:literal) => {
        #[derive(
            Debug,
            Copy,
            Clone,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(i32);

        impl $t {
            pub fn value(&self) -> i32 {
                self.0
            }
        }

        impl $crate::entity::EntityId for $t {
            fn next_after(last: Option<&Self>) -> Option<Self> {
                let next = last.map_or(Some(1), |id| id.0.checked_add(1))?;
                Some(Self(next.max(1)))
            }
        }

        impl ::core::fmt::Display for $t {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::write!(f, "{}({})", $name, self.0)
            }
        }

        impl From<i32> for $t {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i32 {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_ids_are_unique() {
        assert_ne!(ScopeId::new(), ScopeId::new());
    }

    #[test]
    fn scope_id_parses_its_display_form() {
        let id = ScopeId::new();
        let parsed: ScopeId = id.to_string().parse().unwrap();

        assert_eq!(parsed, id);
    }
}
