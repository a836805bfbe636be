use nlayer_core::{DataResult, Repository};

use crate::person::Person;

/// Person-specific queries on top of the generic repository.
pub trait PersonRepository: Repository<Person> {
    /// People whose last name matches exactly.
    fn find_by_last_name(&self, last_name: &str) -> DataResult<Vec<Person>>;
}
