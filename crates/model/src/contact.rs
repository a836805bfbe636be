use serde::{Deserialize, Serialize};

/// Kind of a contact detail (address, e-mail address, phone number).
///
/// `None` is the unset default and never passes validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    #[default]
    None,
    Business,
    Personal,
}

/// Relationship of a person to the owner of the address book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonType {
    #[default]
    None,
    Friend,
    Family,
    Colleague,
}
