//! `nlayer-core`: data-access building blocks.
//!
//! This crate contains the **pure** primitives (no storage, no scopes): value-object
//! equality, entity identity, validation, collections and the repository / unit-of-work
//! contracts.

pub mod aggregate;
pub mod collection;
pub mod entity;
pub mod error;
pub mod id;
pub mod keys;
pub mod repository;
pub mod validation;
pub mod value_object;

pub use aggregate::{
    AggregateRoot, DateTracking, DraftToken, EntityState, ExpectedVersion, HasOwner,
};
pub use collection::Collection;
pub use entity::{Entity, EntityId, same_identity};
pub use error::{DataError, DataResult, ModelValidationError};
pub use id::ScopeId;
pub use keys::KeyAllocator;
pub use repository::{Query, Repository, UnitOfWork};
pub use validation::{Rules, Validate, ValidationResult};
pub use value_object::{Field, FieldValue, ValueObject};
