//! Aggregate roots: the units a data context tracks and persists.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::entity::Entity;
use crate::error::{DataError, DataResult};
use crate::keys::KeyAllocator;
use crate::validation::Validate;

/// Change-tracking state of an entity inside a data context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// New; inserted on save.
    Added,
    /// Changed; replaces the stored copy on save.
    Modified,
    /// Tracked without pending changes.
    Unchanged,
    /// Removed on save.
    Deleted,
}

/// Aggregate root persisted as a whole by a data context.
///
/// Children (addresses, phone numbers, ...) travel with their root; only roots are
/// loaded, added or removed directly.
pub trait AggregateRoot: Entity + Validate + Clone + Send + Sync + 'static {
    /// Child paths callers may name as eager-load includes.
    const NAVIGATIONS: &'static [&'static str] = &[];

    /// Stores the key assigned on insert.
    fn assign_id(&mut self, id: Self::Id);

    /// Last-moment hook before the aggregate is written.
    ///
    /// Children that need store-assigned keys draw them from `keys`.
    fn before_save(
        &mut self,
        _state: EntityState,
        _now: DateTime<Utc>,
        _keys: &mut KeyAllocator,
    ) -> DataResult<()> {
        Ok(())
    }

    /// Identity of a transient aggregate; `None` when clones cannot be told apart
    /// before the store assigns a key.
    fn draft_token(&self) -> Option<DraftToken> {
        None
    }

    /// Optimistic concurrency version; `None` opts out of version checks.
    fn version(&self) -> Option<u64> {
        None
    }

    fn set_version(&mut self, _version: u64) {}
}

/// Identity a transient aggregate shares with its clones.
///
/// Every new token is distinct; copying an aggregate copies its token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DraftToken(u64);

impl DraftToken {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for DraftToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Entities that record when they were created and last modified.
pub trait DateTracking {
    fn date_created(&self) -> Option<DateTime<Utc>>;
    fn date_modified(&self) -> Option<DateTime<Utc>>;
    fn set_date_created(&mut self, at: DateTime<Utc>);
    fn set_date_modified(&mut self, at: DateTime<Utc>);

    /// Stamps both dates on insert and the modification date on update.
    fn touch(&mut self, state: EntityState, now: DateTime<Utc>) {
        match state {
            EntityState::Added => {
                self.set_date_created(now);
                self.set_date_modified(now);
            }
            EntityState::Modified => self.set_date_modified(now),
            EntityState::Unchanged | EntityState::Deleted => {}
        }
    }
}

/// Child objects that know which aggregate owns them.
pub trait HasOwner<T> {
    fn owner(&self) -> Option<&T>;
    fn set_owner(&mut self, owner: T);
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        match aggregate.version() {
            Some(v) => ExpectedVersion::Exact(v),
            None => ExpectedVersion::Any,
        }
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DataResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DataError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Stamped {
        created: Option<DateTime<Utc>>,
        modified: Option<DateTime<Utc>>,
    }

    impl DateTracking for Stamped {
        fn date_created(&self) -> Option<DateTime<Utc>> {
            self.created
        }

        fn date_modified(&self) -> Option<DateTime<Utc>> {
            self.modified
        }

        fn set_date_created(&mut self, at: DateTime<Utc>) {
            self.created = Some(at);
        }

        fn set_date_modified(&mut self, at: DateTime<Utc>) {
            self.modified = Some(at);
        }
    }

    #[test]
    fn touch_on_insert_sets_both_dates() {
        let now = Utc::now();
        let mut stamped = Stamped::default();
        stamped.touch(EntityState::Added, now);

        assert_eq!(stamped.date_created(), Some(now));
        assert_eq!(stamped.date_modified(), Some(now));
    }

    #[test]
    fn touch_on_update_keeps_creation_date() {
        let created = Utc::now();
        let later = created + chrono::Duration::seconds(5);
        let mut stamped = Stamped::default();
        stamped.touch(EntityState::Added, created);
        stamped.touch(EntityState::Modified, later);

        assert_eq!(stamped.date_created(), Some(created));
        assert_eq!(stamped.date_modified(), Some(later));
    }

    #[test]
    fn expected_version_check_reports_conflict() {
        assert!(ExpectedVersion::Any.check(9).is_ok());
        assert!(ExpectedVersion::Exact(2).check(2).is_ok());

        let err = ExpectedVersion::Exact(1).check(2).unwrap_err();
        assert!(matches!(err, DataError::Conflict(_)));
    }

    #[test]
    fn draft_tokens_are_distinct_but_copy_with_their_owner() {
        let token = DraftToken::new();
        let copied = token;

        assert_eq!(token, copied);
        assert_ne!(DraftToken::new(), DraftToken::default());
    }
}
