use serde::{Deserialize, Serialize};

use nlayer_core::{Entity, HasOwner, Rules, Validate, ValidationResult};

use crate::contact::ContactType;
use crate::person::PersonId;

nlayer_core::int_entity_id!(PhoneNumberId, "PhoneNumberId");

/// A phone number owned by a person.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhoneNumber {
    id: PhoneNumberId,
    pub number: String,
    pub contact_type: ContactType,
    owner: Option<PersonId>,
}

impl PhoneNumber {
    pub fn new(number: impl Into<String>, contact_type: ContactType) -> Self {
        Self {
            number: number.into(),
            contact_type,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: PhoneNumberId) -> Self {
        self.id = id;
        self
    }

    pub(crate) fn assign_id(&mut self, id: PhoneNumberId) {
        self.id = id;
    }
}

impl Entity for PhoneNumber {
    type Id = PhoneNumberId;

    fn id(&self) -> &PhoneNumberId {
        &self.id
    }
}

nlayer_core::identity_semantics!(PhoneNumber);

impl HasOwner<PersonId> for PhoneNumber {
    fn owner(&self) -> Option<&PersonId> {
        self.owner.as_ref()
    }

    fn set_owner(&mut self, owner: PersonId) {
        self.owner = Some(owner);
    }
}

impl Validate for PhoneNumber {
    fn validate(&self) -> Vec<ValidationResult> {
        let mut rules = Rules::new();
        rules
            .required("number", Some(self.number.as_str()))
            .not_none("contact_type", &self.contact_type);
        rules.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_phone_number_defaults_to_type_none() {
        assert_eq!(PhoneNumber::default().contact_type, ContactType::None);
    }

    #[test]
    fn empty_phone_number_is_invalid() {
        let phone = PhoneNumber::default();
        let results = phone.validate();

        assert!(!results.is_empty());
        assert!(results.iter().any(|r| r.concerns("number")));
    }

    #[test]
    fn phone_number_with_type_none_is_invalid() {
        let phone = PhoneNumber::new("555-1234567", ContactType::None);

        assert!(phone.validate().iter().any(|r| r.concerns("contact_type")));
    }

    #[test]
    fn phone_numbers_compare_by_id() {
        let left = PhoneNumber::new("1", ContactType::Business).with_id(PhoneNumberId::from(5));
        let right = PhoneNumber::new("2", ContactType::Personal).with_id(PhoneNumberId::from(5));

        assert!(left == right);
        assert!(PhoneNumber::default() != PhoneNumber::default());
    }
}
