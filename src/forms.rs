//! The contact form: raw input, parsing and validation.
//!
//! Validation runs entirely on the client and reports every failing field
//! at once. A form that fails validation is never sent.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_MESSAGE_CHARS: usize = 10;
pub const MIN_AGE: f64 = 18.0;
pub const MAX_AGE: f64 = 120.0;

// Leading dots and doubled dots are rejected separately; `regex` has no
// lookahead.
const EMAIL_PATTERN: &str = r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$";

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Age,
    Message,
}

impl Field {
    /// Fields in display order.
    pub const ALL: [Self; 4] = [Self::Name, Self::Email, Self::Age, Self::Message];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Age => "Age",
            Self::Message => "Message",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every field error found in one validation pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationErrors(Vec<FieldError>);

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    /// Message for `field`, if it failed.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// A validated form as sent to `POST /api/submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub name: String,
    pub email: String,
    /// Whole ages go out as JSON integers.
    #[serde(serialize_with = "serialize_age")]
    pub age: f64,
    pub message: String,
}

impl FormSubmission {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_text(&mut errors, &self.name, &self.email, &self.message);
        if let Some(message) = age_error(self.age) {
            errors.push(Field::Age, message);
        }
        sort(errors).into_result()
    }
}

/// Raw text typed into the form; the age is still a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDraft {
    pub name: String,
    pub email: String,
    pub age: String,
    pub message: String,
}

impl FormDraft {
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Age => &self.age,
            Field::Message => &self.message,
        }
    }

    pub fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Age => &mut self.age,
            Field::Message => &mut self.message,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Parses and validates the draft.
    ///
    /// # Errors
    ///
    /// Returns every failing field, including a non-numeric age.
    pub fn parse(&self) -> Result<FormSubmission, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_text(&mut errors, &self.name, &self.email, &self.message);

        let age = match self.age.trim().parse::<f64>().map(|age| (age, age_error(age))) {
            Ok((age, None)) => Some(age),
            Ok((_, Some(message))) => {
                errors.push(Field::Age, message);
                None
            }
            Err(_) => {
                errors.push(Field::Age, "Age must be a number");
                None
            }
        };

        let errors = sort(errors);
        match age {
            Some(age) if errors.is_empty() => Ok(FormSubmission {
                name: self.name.clone(),
                email: self.email.clone(),
                age,
                message: self.message.clone(),
            }),
            _ => Err(errors),
        }
    }
}

fn check_text(errors: &mut ValidationErrors, name: &str, email: &str, message: &str) {
    if name.chars().count() < MIN_NAME_CHARS {
        errors.push(Field::Name, "Name must be at least 2 characters");
    }
    if !is_valid_email(email) {
        errors.push(Field::Email, "Invalid email address");
    }
    if message.chars().count() < MIN_MESSAGE_CHARS {
        errors.push(Field::Message, "Message must be at least 10 characters");
    }
}

fn age_error(age: f64) -> Option<&'static str> {
    if !age.is_finite() {
        Some("Age must be a number")
    } else if age < MIN_AGE {
        Some("Must be at least 18 years old")
    } else if age > MAX_AGE {
        Some("Invalid age")
    } else {
        None
    }
}

fn sort(mut errors: ValidationErrors) -> ValidationErrors {
    errors
        .0
        .sort_by_key(|e| Field::ALL.iter().position(|f| *f == e.field));
    errors
}

fn serialize_age<S: Serializer>(age: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if age.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(age) {
        // Whole and in range, so the cast is exact.
        serializer.serialize_u32(*age as u32)
    } else {
        serializer.serialize_f64(*age)
    }
}

/// A conventional `local@domain.tld` address: letters, digits and `_'+-.` in
/// the local part (no leading, trailing or doubled dots), dash-separated
/// domain labels and an alphabetic TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    if email.starts_with('.') || email.contains("..") {
        return false;
    }
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}
