use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use nlayer_core::{
    AggregateRoot, DataResult, DateTracking, DraftToken, Entity, EntityState, HasOwner,
    KeyAllocator, Rules, Validate, ValidationResult,
};

use crate::address::Address;
use crate::collections::{EmailAddressCollection, PhoneNumberCollection};
use crate::contact::PersonType;

nlayer_core::int_entity_id!(PersonId, "PersonId");

/// Oldest accepted date of birth, in months before today.
const MAX_AGE_MONTHS: u32 = 130 * 12;

/// A person in the address book; the aggregate root of the model.
///
/// E-mail addresses and phone numbers belong to the person and are saved with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Person {
    id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub person_type: PersonType,
    pub date_of_birth: Option<NaiveDate>,
    pub email_addresses: EmailAddressCollection,
    pub phone_numbers: PhoneNumberCollection,
    pub home_address: Address,
    pub work_address: Address,
    date_created: Option<DateTime<Utc>>,
    date_modified: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    draft: DraftToken,
}

impl Person {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        person_type: PersonType,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            person_type,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: PersonId) -> Self {
        self.id = id;
        self
    }

    /// First and last name separated by a single space; empty parts are skipped.
    pub fn full_name(&self) -> String {
        [self.first_name.as_str(), self.last_name.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn birth_date_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let min = today
            .checked_sub_months(Months::new(MAX_AGE_MONTHS))
            .unwrap_or(NaiveDate::MIN);
        (min, today)
    }

    /// Keys new children from the store-wide sequences and points every child at this
    /// person.
    fn adopt_children(&mut self, keys: &mut KeyAllocator) -> DataResult<()> {
        if self.is_transient() {
            return Ok(());
        }
        let owner = self.id;

        for email in self.email_addresses.iter() {
            keys.observe(email.id());
        }
        for phone in self.phone_numbers.iter() {
            keys.observe(phone.id());
        }

        for email in self.email_addresses.iter_mut() {
            if email.is_transient() {
                email.assign_id(keys.next()?);
            }
            email.set_owner(owner);
        }
        for phone in self.phone_numbers.iter_mut() {
            if phone.is_transient() {
                phone.assign_id(keys.next()?);
            }
            phone.set_owner(owner);
        }
        Ok(())
    }
}

impl Entity for Person {
    type Id = PersonId;

    fn id(&self) -> &PersonId {
        &self.id
    }
}

nlayer_core::identity_semantics!(Person);

impl Validate for Person {
    fn validate(&self) -> Vec<ValidationResult> {
        let (min, max) = Self::birth_date_bounds(Utc::now().date_naive());

        let mut rules = Rules::new();
        rules
            .required("first_name", Some(self.first_name.as_str()))
            .required("last_name", Some(self.last_name.as_str()))
            .not_none("person_type", &self.person_type)
            .date_range("date_of_birth", self.date_of_birth, min, max)
            .nested(self.home_address.validate())
            .nested(self.work_address.validate())
            .nested(self.email_addresses.validate())
            .nested(self.phone_numbers.validate());
        rules.finish()
    }
}

impl DateTracking for Person {
    fn date_created(&self) -> Option<DateTime<Utc>> {
        self.date_created
    }

    fn date_modified(&self) -> Option<DateTime<Utc>> {
        self.date_modified
    }

    fn set_date_created(&mut self, at: DateTime<Utc>) {
        self.date_created = Some(at);
    }

    fn set_date_modified(&mut self, at: DateTime<Utc>) {
        self.date_modified = Some(at);
    }
}

impl AggregateRoot for Person {
    const NAVIGATIONS: &'static [&'static str] = &["email_addresses", "phone_numbers"];

    fn assign_id(&mut self, id: PersonId) {
        self.id = id;
    }

    fn before_save(
        &mut self,
        state: EntityState,
        now: DateTime<Utc>,
        keys: &mut KeyAllocator,
    ) -> DataResult<()> {
        self.touch(state, now);
        self.adopt_children(keys)
    }

    fn draft_token(&self) -> Option<DraftToken> {
        Some(self.draft)
    }

    fn version(&self) -> Option<u64> {
        Some(self.version)
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
