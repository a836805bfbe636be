use serde::{Deserialize, Serialize};

use nlayer_core::{Entity, HasOwner, Rules, Validate, ValidationResult};

use crate::contact::ContactType;
use crate::person::PersonId;

nlayer_core::int_entity_id!(EmailAddressId, "EmailAddressId");

/// An e-mail address owned by a person.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailAddress {
    id: EmailAddressId,
    pub email_address_text: String,
    pub contact_type: ContactType,
    owner: Option<PersonId>,
}

impl EmailAddress {
    pub fn new(email_address_text: impl Into<String>, contact_type: ContactType) -> Self {
        Self {
            email_address_text: email_address_text.into(),
            contact_type,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: EmailAddressId) -> Self {
        self.id = id;
        self
    }

    pub(crate) fn assign_id(&mut self, id: EmailAddressId) {
        self.id = id;
    }
}

impl Entity for EmailAddress {
    type Id = EmailAddressId;

    fn id(&self) -> &EmailAddressId {
        &self.id
    }
}

nlayer_core::identity_semantics!(EmailAddress);

impl HasOwner<PersonId> for EmailAddress {
    fn owner(&self) -> Option<&PersonId> {
        self.owner.as_ref()
    }

    fn set_owner(&mut self, owner: PersonId) {
        self.owner = Some(owner);
    }
}

impl Validate for EmailAddress {
    fn validate(&self) -> Vec<ValidationResult> {
        let text = Some(self.email_address_text.as_str());
        let mut rules = Rules::new();
        rules
            .required("email_address_text", text)
            .email("email_address_text", text)
            .not_none("contact_type", &self.contact_type);
        rules.finish()
    }
}
