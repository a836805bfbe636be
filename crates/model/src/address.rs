use serde::{Deserialize, Serialize};

use nlayer_core::{Field, Rules, Validate, ValidationResult, ValueObject};

use crate::contact::ContactType;

/// Postal address value object.
///
/// An address with every text part absent is the *null address*: a valid placeholder
/// for "no address". Once any part is filled in, all parts and a contact type are
/// required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    street: Option<String>,
    city: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
    contact_type: ContactType,
}

impl Address {
    pub fn new(
        street: Option<&str>,
        city: Option<&str>,
        zip_code: Option<&str>,
        country: Option<&str>,
        contact_type: ContactType,
    ) -> Self {
        Self {
            street: street.map(str::to_string),
            city: city.map(str::to_string),
            zip_code: zip_code.map(str::to_string),
            country: country.map(str::to_string),
            contact_type,
        }
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn zip_code(&self) -> Option<&str> {
        self.zip_code.as_deref()
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    pub fn contact_type(&self) -> ContactType {
        self.contact_type
    }

    /// True when no text part is set.
    pub fn is_null(&self) -> bool {
        self.street.is_none()
            && self.city.is_none()
            && self.zip_code.is_none()
            && self.country.is_none()
    }
}

impl Validate for Address {
    fn validate(&self) -> Vec<ValidationResult> {
        if self.is_null() {
            return Vec::new();
        }

        let mut rules = Rules::new();
        rules
            .not_blank("street", self.street())
            .not_blank("city", self.city())
            .not_blank("zip_code", self.zip_code())
            .not_blank("country", self.country())
            .not_none("contact_type", &self.contact_type);
        rules.finish()
    }
}

impl ValueObject for Address {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::optional(self.street.as_ref()),
            Field::optional(self.city.as_ref()),
            Field::optional(self.zip_code.as_ref()),
            Field::optional(self.country.as_ref()),
            Field::value(&self.contact_type),
        ]
    }
}

nlayer_core::value_semantics!(Address);
