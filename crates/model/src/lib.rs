//! `nlayer-model`: the address-book domain model.
//!
//! A [`Person`] is the aggregate root; it owns its [`EmailAddress`]es and
//! [`PhoneNumber`]s and embeds two [`Address`] value objects.

pub mod address;
pub mod collections;
pub mod contact;
pub mod email_address;
pub mod person;
pub mod phone_number;
pub mod repository;

pub use address::Address;
pub use collections::{
    ContactCollectionExt, EmailAddressCollection, PersonCollection, PhoneNumberCollection,
};
pub use contact::{ContactType, PersonType};
pub use email_address::{EmailAddress, EmailAddressId};
pub use person::{Person, PersonId};
pub use phone_number::{PhoneNumber, PhoneNumberId};
pub use repository::PersonRepository;
