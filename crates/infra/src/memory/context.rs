use std::any::{Any, type_name};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use nlayer_core::{
    AggregateRoot, DataError, DataResult, Entity, EntityState, ExpectedVersion, KeyAllocator,
    ModelValidationError, Query, ValidationResult,
};

use super::database::{MemoryDatabase, Tables};
use crate::data_context::{DataContext, EntitySet};

/// A tracked aggregate, type-erased so one tracker holds every aggregate type.
///
/// Saving runs in three steps: `check` every entry against the stored state, `prepare`
/// the values to write, then `commit` them. Only `commit` touches the tables, and it
/// cannot fail once `check` passed, so a save either writes everything or nothing.
trait TrackedEntity: Send {
    fn as_any(&self) -> &dyn Any;
    fn validate(&self) -> Vec<ValidationResult>;
    fn type_name(&self) -> &'static str;
    fn describe(&self) -> String;
    fn check(&self, state: EntityState, tables: &Tables, keys: &mut KeyAllocator)
    -> DataResult<()>;
    fn prepare(
        &self,
        state: EntityState,
        keys: &mut KeyAllocator,
        now: DateTime<Utc>,
    ) -> DataResult<Box<dyn TrackedEntity>>;
    fn commit(self: Box<Self>, state: EntityState, tables: &mut Tables) -> DataResult<()>;
}

struct Tracked<E>(E);

impl<E: AggregateRoot> Tracked<E> {
    fn stored<'t>(&self, tables: &'t Tables) -> DataResult<&'t E> {
        tables.get::<E>(self.0.id())?.ok_or_else(|| {
            DataError::conflict(format!(
                "{} {} no longer exists",
                type_name::<E>(),
                self.0.id()
            ))
        })
    }
}

impl<E: AggregateRoot> TrackedEntity for Tracked<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self) -> Vec<ValidationResult> {
        self.0.validate()
    }

    fn type_name(&self) -> &'static str {
        type_name::<E>()
    }

    fn describe(&self) -> String {
        if self.0.is_transient() {
            "This entity was added in this session.".to_string()
        } else {
            format!("The id of the entity is {}.", self.0.id())
        }
    }

    fn check(
        &self,
        state: EntityState,
        tables: &Tables,
        keys: &mut KeyAllocator,
    ) -> DataResult<()> {
        let table = tables.table::<E>()?;
        if let Some(last) = table.and_then(|table| table.keys().next_back()) {
            keys.observe(last);
        }

        match state {
            EntityState::Added => {
                if self.0.is_transient() {
                    return Ok(());
                }
                if tables.get::<E>(self.0.id())?.is_some() {
                    return Err(DataError::conflict(format!(
                        "{} {} already exists",
                        type_name::<E>(),
                        self.0.id()
                    )));
                }
                keys.observe(self.0.id());
                Ok(())
            }
            EntityState::Modified | EntityState::Deleted => {
                let stored = self.stored(tables)?;
                match stored.version() {
                    Some(actual) => ExpectedVersion::of(&self.0).check(actual),
                    None => Ok(()),
                }
            }
            EntityState::Unchanged => Ok(()),
        }
    }

    fn prepare(
        &self,
        state: EntityState,
        keys: &mut KeyAllocator,
        now: DateTime<Utc>,
    ) -> DataResult<Box<dyn TrackedEntity>> {
        let mut entity = self.0.clone();
        match state {
            EntityState::Added => {
                if entity.is_transient() {
                    entity.assign_id(keys.next::<E::Id>()?);
                }
                entity.before_save(state, now, keys)?;
                if entity.version().is_some() {
                    entity.set_version(1);
                }
            }
            EntityState::Modified => {
                entity.before_save(state, now, keys)?;
                if let Some(version) = entity.version() {
                    entity.set_version(version + 1);
                }
            }
            EntityState::Deleted | EntityState::Unchanged => {}
        }
        Ok(Box::new(Tracked(entity)))
    }

    fn commit(self: Box<Self>, state: EntityState, tables: &mut Tables) -> DataResult<()> {
        let Tracked(entity) = *self;
        let table = tables.table_mut::<E>()?;
        match state {
            EntityState::Added | EntityState::Modified => {
                table.insert(entity.id().clone(), entity);
            }
            EntityState::Deleted => {
                table.remove(entity.id());
            }
            EntityState::Unchanged => {}
        }
        Ok(())
    }
}

struct Entry {
    state: EntityState,
    entity: Box<dyn TrackedEntity>,
}

impl Entry {
    /// Stored aggregates match by key; transient ones by their draft token.
    fn is<E: AggregateRoot>(&self, entity: &E) -> bool {
        let Some(tracked) = self.entity.as_any().downcast_ref::<Tracked<E>>() else {
            return false;
        };
        if entity.is_transient() {
            tracked.0.is_transient()
                && entity.draft_token().is_some()
                && tracked.0.draft_token() == entity.draft_token()
        } else {
            tracked.0.id() == entity.id()
        }
    }
}

/// Data context over a [`MemoryDatabase`].
///
/// Reads always see committed state. Inserts, deletes and state changes are recorded
/// in a change tracker and written together by [`DataContext::save_changes`], which
/// validates every added or modified aggregate first and writes nothing if any fails.
pub struct InMemoryContext {
    database: Arc<MemoryDatabase>,
    tracker: Mutex<Vec<Entry>>,
}

impl InMemoryContext {
    pub fn new(database: Arc<MemoryDatabase>) -> Self {
        Self {
            database,
            tracker: Mutex::new(Vec::new()),
        }
    }

    pub fn database(&self) -> &Arc<MemoryDatabase> {
        &self.database
    }

    /// Number of tracked pending changes.
    pub fn pending(&self) -> usize {
        self.tracker.lock().map(|t| t.len()).unwrap_or(0)
    }

    /// Tracked state of an aggregate; `None` when no change is pending for it.
    pub fn state_of<E: AggregateRoot>(&self, entity: &E) -> Option<EntityState> {
        let tracker = self.tracker.lock().ok()?;
        tracker.iter().find(|e| e.is(entity)).map(|e| e.state)
    }

    fn tracker(&self) -> DataResult<MutexGuard<'_, Vec<Entry>>> {
        self.tracker
            .lock()
            .map_err(|_| DataError::storage("change tracker lock poisoned"))
    }

    fn track<E: AggregateRoot>(&self, entity: E, state: EntityState) -> DataResult<()> {
        let mut tracker = self.tracker()?;
        let existing = tracker.iter().position(|e| e.is(&entity));

        if entity.is_transient() && existing.is_none() {
            match state {
                EntityState::Deleted => {
                    return Err(DataError::not_found(format!(
                        "{} has no pending insert in this context",
                        type_name::<E>()
                    )));
                }
                EntityState::Unchanged => return Ok(()),
                EntityState::Added | EntityState::Modified => {}
            }
        }

        let entry = Entry {
            state,
            entity: Box::new(Tracked(entity)),
        };
        match (existing, state) {
            (Some(index), EntityState::Unchanged) => {
                tracker.remove(index);
            }
            (None, EntityState::Unchanged) => {}
            (Some(index), EntityState::Deleted) if tracker[index].state == EntityState::Added => {
                tracker.remove(index);
            }
            (Some(index), EntityState::Modified) if tracker[index].state == EntityState::Added => {
                tracker[index].entity = entry.entity;
            }
            (Some(index), _) => tracker[index] = entry,
            (None, _) => tracker.push(entry),
        }
        Ok(())
    }

    fn validation_error(tracker: &[Entry]) -> Option<ModelValidationError> {
        let mut summary = Vec::new();
        let mut errors = Vec::new();

        for entry in tracker
            .iter()
            .filter(|e| matches!(e.state, EntityState::Added | EntityState::Modified))
        {
            for result in entry.entity.validate() {
                summary.push(format!(
                    "Entity of type {} has validation error \"{}\" for {}. {}",
                    entry.entity.type_name(),
                    result.message(),
                    result.member_names().join(", "),
                    entry.entity.describe()
                ));
                errors.push(result);
            }
        }

        (!errors.is_empty()).then(|| ModelValidationError::new(summary.join("\n"), errors))
    }
}

impl core::fmt::Debug for InMemoryContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryContext")
            .field("database", &self.database)
            .field("pending", &self.pending())
            .finish()
    }
}

impl DataContext for InMemoryContext {
    fn create() -> DataResult<Self> {
        Ok(Self::new(MemoryDatabase::shared()))
    }

    fn save_changes(&self) -> DataResult<usize> {
        let mut tracker = self.tracker()?;
        if tracker.is_empty() {
            return Ok(0);
        }

        if let Some(error) = Self::validation_error(&tracker) {
            tracing::warn!(
                failures = error.errors().len(),
                "rejected save: model validation failed"
            );
            return Err(error.into());
        }

        let now = Utc::now();
        let written = self
            .database
            .write(|tables| {
                let mut keys = tables.keys().clone();
                for entry in tracker.iter() {
                    entry.entity.check(entry.state, tables, &mut keys)?;
                }

                let mut prepared = Vec::with_capacity(tracker.len());
                for entry in tracker.iter() {
                    prepared.push((entry.state, entry.entity.prepare(entry.state, &mut keys, now)?));
                }

                let written = prepared.len();
                for (state, entity) in prepared {
                    entity.commit(state, tables)?;
                }
                tables.set_keys(keys);
                Ok(written)
            })
            .inspect_err(|err| tracing::warn!(error = %err, "rejected save"))?;

        tracker.clear();
        tracing::info!(written, "saved changes");
        Ok(written)
    }

    fn has_changes(&self) -> bool {
        self.pending() > 0
    }
}

impl<E: AggregateRoot> EntitySet<E> for InMemoryContext {
    fn load(&self, id: &E::Id) -> DataResult<Option<E>> {
        self.database
            .read(|tables| Ok(tables.get::<E>(id)?.cloned()))
    }

    fn query(&self) -> DataResult<Query<E>> {
        let items: Vec<E> = self.database.read(|tables| {
            Ok(tables
                .table::<E>()?
                .map(|table| table.values().cloned().collect())
                .unwrap_or_default())
        })?;
        Ok(Query::new(items))
    }

    fn insert(&self, entity: E) -> DataResult<()> {
        self.track(entity, EntityState::Added)
    }

    fn delete(&self, entity: &E) -> DataResult<()> {
        self.track(entity.clone(), EntityState::Deleted)
    }

    fn set_state(&self, entity: &E, state: EntityState) -> DataResult<()> {
        self.track(entity.clone(), state)
    }
}
