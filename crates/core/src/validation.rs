//! Declarative validation for domain objects.
//!
//! Domain types describe their rules with a [`Rules`] builder inside
//! [`Validate::validate`]. Validation never fails eagerly: objects may sit in an
//! invalid state in memory, and the results are only enforced when changes are saved
//! (see [`ModelValidationError`](crate::error::ModelValidationError)).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid e-mail regex")
});

/// A single validation failure: a message plus the members it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationResult {
    message: String,
    member_names: Vec<String>,
}

impl ValidationResult {
    pub fn new<I, S>(message: impl Into<String>, member_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            member_names: member_names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn member_names(&self) -> &[String] {
        &self.member_names
    }

    /// Whether this result names `member`.
    pub fn concerns(&self, member: &str) -> bool {
        self.member_names.iter().any(|m| m == member)
    }
}

impl core::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Objects that can report their own validation failures.
pub trait Validate {
    /// Returns every validation failure; empty when the object is valid.
    fn validate(&self) -> Vec<ValidationResult>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Accumulates validation failures for one object.
#[derive(Debug, Default)]
pub struct Rules {
    results: Vec<ValidationResult>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails when the value is absent, empty or whitespace.
    pub fn required(&mut self, member: &str, value: Option<&str>) -> &mut Self {
        if is_blank(value) {
            self.fail(format!("The {member} field is required."), member);
        }
        self
    }

    /// Like [`Rules::required`], with the terse message used by address parts.
    pub fn not_blank(&mut self, member: &str, value: Option<&str>) -> &mut Self {
        if is_blank(value) {
            self.fail(format!("{member} can't be null or empty"), member);
        }
        self
    }

    /// Fails when an enum is still at its `None` (default) variant.
    pub fn not_none<T: PartialEq + Default>(&mut self, member: &str, value: &T) -> &mut Self {
        if *value == T::default() {
            self.fail(format!("{member} can't be None"), member);
        }
        self
    }

    /// Checks the e-mail shape of a present, non-blank value.
    pub fn email(&mut self, member: &str, value: Option<&str>) -> &mut Self {
        if let Some(text) = value.filter(|v| !v.trim().is_empty()) {
            if !EMAIL_RE.is_match(text) {
                self.fail(
                    format!("The {member} field is not a valid e-mail address."),
                    member,
                );
            }
        }
        self
    }

    /// Checks an optional date against an inclusive range.
    pub fn date_range(
        &mut self,
        member: &str,
        value: Option<NaiveDate>,
        min: NaiveDate,
        max: NaiveDate,
    ) -> &mut Self {
        if let Some(date) = value {
            if date < min || date > max {
                self.fail(
                    format!("Invalid range for {member}; must be between {min} and {max}."),
                    member,
                );
            }
        }
        self
    }

    /// Appends the results of a nested object or collection.
    pub fn nested(&mut self, results: impl IntoIterator<Item = ValidationResult>) -> &mut Self {
        self.results.extend(results);
        self
    }

    pub fn push(&mut self, result: ValidationResult) -> &mut Self {
        self.results.push(result);
        self
    }

    pub fn finish(self) -> Vec<ValidationResult> {
        self.results
    }

    fn fail(&mut self, message: String, member: &str) {
        self.results.push(ValidationResult::new(message, [member]));
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
