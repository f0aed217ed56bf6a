//! Static field rules
//!
//! Pure, synchronous validation of the four onboarding fields. Never touches
//! the network and never fails: every input string yields a `ValidationResult`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use onboard_client::ProfileDetails;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const FIRST_NAME_REQUIRED: &str = "First name is required";
pub const LAST_NAME_REQUIRED: &str = "Last name is required";
pub const MAX_NAME_LENGTH: &str = "Max 50 characters";
pub const PHONE_FORMAT: &str = "Use +1 followed by 10 digits";
pub const CORPORATION_NUMBER_FORMAT: &str = "Must be exactly 9 digits";

/// Longest accepted first/last name, in characters
pub const NAME_MAX_CHARS: usize = 50;

// ASCII classes: `\d` in the regex crate would also accept non-Latin digits.
static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+1[0-9]{10}$").expect("Invalid phone regex"));

static CORPORATION_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9}$").expect("Invalid corporation number regex"));

/// Onboarding form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    LastName,
    Phone,
    CorporationNumber,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::FirstName,
        Field::LastName,
        Field::Phone,
        Field::CorporationNumber,
    ];

    /// Wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Phone => "phone",
            Field::CorporationNumber => "corporationNumber",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw form values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub corporation_number: String,
}

impl FormFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Phone => &self.phone,
            Field::CorporationNumber => &self.corporation_number,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Phone => &mut self.phone,
            Field::CorporationNumber => &mut self.corporation_number,
        };
        *slot = value.into();
    }

    /// Submission payload for these values
    pub fn to_profile(&self) -> ProfileDetails {
        ProfileDetails {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            corporation_number: self.corporation_number.clone(),
        }
    }
}

/// Per-field error messages. A field without an entry is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    errors: BTreeMap<Field, String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn clear(&mut self, field: Field) {
        self.errors.remove(&field);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Returns true if `value` is exactly nine ASCII digits
pub fn is_corporation_number(value: &str) -> bool {
    CORPORATION_NUMBER_REGEX.is_match(value)
}

/// Rule for a single field
pub fn validate_field(field: Field, value: &str) -> Option<&'static str> {
    match field {
        Field::FirstName => check_name(value, FIRST_NAME_REQUIRED),
        Field::LastName => check_name(value, LAST_NAME_REQUIRED),
        Field::Phone => (!PHONE_REGEX.is_match(value)).then_some(PHONE_FORMAT),
        Field::CorporationNumber => {
            (!is_corporation_number(value)).then_some(CORPORATION_NUMBER_FORMAT)
        }
    }
}

/// Evaluate every rule against `fields`
pub fn validate(fields: &FormFields) -> ValidationResult {
    let mut result = ValidationResult::default();
    for field in Field::ALL {
        if let Some(message) = validate_field(field, fields.get(field)) {
            result.set(field, message);
        }
    }
    result
}

fn check_name(value: &str, required: &'static str) -> Option<&'static str> {
    if value.is_empty() {
        Some(required)
    } else if value.chars().count() > NAME_MAX_CHARS {
        Some(MAX_NAME_LENGTH)
    } else {
        None
    }
}
