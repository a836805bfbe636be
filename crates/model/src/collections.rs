//! Typed collections of the model's objects.

use nlayer_core::Collection;

use crate::contact::ContactType;
use crate::email_address::EmailAddress;
use crate::person::Person;
use crate::phone_number::PhoneNumber;

pub type PersonCollection = Collection<Person>;
pub type EmailAddressCollection = Collection<EmailAddress>;
pub type PhoneNumberCollection = Collection<PhoneNumber>;

/// Shorthand for appending a new contact detail from its text and type.
pub trait ContactCollectionExt {
    fn add_new(&mut self, value: &str, contact_type: ContactType);
}

impl ContactCollectionExt for EmailAddressCollection {
    fn add_new(&mut self, email_address_text: &str, contact_type: ContactType) {
        self.add(EmailAddress::new(email_address_text, contact_type));
    }
}

impl ContactCollectionExt for PhoneNumberCollection {
    fn add_new(&mut self, number: &str, contact_type: ContactType) {
        self.add(PhoneNumber::new(number, contact_type));
    }
}

#[cfg(test)]
mod tests {
    use nlayer_core::Validate;

    use super::*;
    use crate::contact::PersonType;

    #[test]
    fn validating_a_person_collection_reports_every_person() {
        let mut john = Person::default();
        john.first_name = "John".into();
        let mut doe = Person::default();
        doe.last_name = "Doe".into();

        let mut people = PersonCollection::new();
        people.add_range([john, doe]);

        let results = people.validate();
        let messages: Vec<&str> = results.iter().map(|r| r.message()).collect();

        assert!(messages.contains(&"The last_name field is required."));
        assert!(messages.contains(&"The first_name field is required."));
        assert!(
            messages.iter().position(|m| *m == "The last_name field is required.")
                < messages.iter().position(|m| *m == "The first_name field is required.")
        );
    }

    #[test]
    fn people_sort_with_a_comparer() {
        let mut people: PersonCollection = ["Zed", "Amy", "Kim"]
            .into_iter()
            .map(|name| Person::new(name, "Doe", PersonType::Friend))
            .collect();
        people.sort_by(|a, b| a.first_name.cmp(&b.first_name));

        let names: Vec<String> = people.iter().map(Person::full_name).collect();
        assert_eq!(names, ["Amy Doe", "Kim Doe", "Zed Doe"]);
    }

    #[test]
    fn add_new_appends_contact_details() {
        let mut emails = EmailAddressCollection::new();
        emails.add_new("imar@example.com", ContactType::Business);
        let mut phones = PhoneNumberCollection::new();
        phones.add_new("555-1234", ContactType::Personal);
        phones.add_new("555-5678", ContactType::Business);

        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].email_address_text, "imar@example.com");
        assert_eq!(phones.len(), 2);
        assert_eq!(phones[1].contact_type, ContactType::Business);
    }

    #[test]
    fn copied_collection_is_independent() {
        let mut phones = PhoneNumberCollection::new();
        phones.add_new("555", ContactType::Business);
        let mut copy = PhoneNumberCollection::from(&phones);
        copy.add_new("556", ContactType::Business);

        assert_eq!(phones.len(), 1);
        assert_eq!(copy.len(), 2);
    }
}
