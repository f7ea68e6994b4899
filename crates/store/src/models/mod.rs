//! Domain models for the entity store.
//!
//! Each entity has three shapes:
//! - the stored entity (`Client`, `Contact`, ...) as returned to callers
//! - a create input (`ClientInput`, ...) carrying every caller-settable field
//! - an update input (`ClientUpdate`, ...) where `None` leaves a field untouched
//!
//! Inputs are validated at the store boundary, before any storage call, and
//! reject unknown fields when deserialised.

pub mod client;
pub mod contact;
pub mod item;
pub mod job;
pub mod service;
pub mod user;

use serde::{Deserialize, Serialize};

use washline_core::Email;

use crate::error::ValidationErrors;

pub use client::{Client, ClientChanges, ClientInput, ClientUpdate, NewClient};
pub use contact::{Contact, ContactChanges, ContactInput, ContactUpdate, NewContact};
pub use item::{Item, ItemInput, ItemUpdate};
pub use job::{Job, JobInput, JobUpdate};
pub use service::{Service, ServiceInput, ServiceUpdate};
pub use user::{NewUser, User, UserChanges, UserInput, UserUpdate};

/// Longest accepted name or title.
pub const MAX_NAME_LENGTH: usize = 200;

/// Postal address; every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Trim every part; an address with no parts left is `None`.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let address = Self {
            street: optional_text(self.street),
            city: optional_text(self.city),
            state: optional_text(self.state),
            postal_code: optional_text(self.postal_code),
            country: optional_text(self.country),
        };
        (address != Self::default()).then_some(address)
    }
}

/// Trimmed, non-empty, bounded text for a required field.
pub(crate) fn required_text(errors: &mut ValidationErrors, field: &'static str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "is required");
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(field, format!("must be at most {MAX_NAME_LENGTH} characters"));
    }
    value.to_owned()
}

/// Trimmed text; blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Optional email form field; blank becomes `None`.
pub(crate) fn optional_email(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
) -> Option<Email> {
    match Email::parse_optional(value.unwrap_or_default()) {
        Ok(email) => email,
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

/// Update semantics for a clearable text field: `Some("")` clears it.
pub(crate) fn clearable_text(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| optional_text(Some(v)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalized() {
        let address = Address {
            street: Some("  12 Mill Lane ".to_string()),
            city: Some(String::new()),
            ..Address::default()
        };
        let normalized = address.normalized().unwrap();
        assert_eq!(normalized.street.as_deref(), Some("12 Mill Lane"));
        assert!(normalized.city.is_none());

        let blank = Address {
            country: Some("   ".to_string()),
            ..Address::default()
        };
        assert!(blank.normalized().is_none());
    }

    #[test]
    fn test_required_text() {
        let mut errors = ValidationErrors::new();
        assert_eq!(required_text(&mut errors, "name", "  Ana "), "Ana");
        assert!(errors.is_empty());

        required_text(&mut errors, "name", "   ");
        required_text(&mut errors, "title", &"x".repeat(MAX_NAME_LENGTH + 1));
        assert!(errors.has("name"));
        assert!(errors.has("title"));
    }

    #[test]
    fn test_clearable_text() {
        assert_eq!(clearable_text(None), None);
        assert_eq!(clearable_text(Some("  ".to_string())), Some(None));
        assert_eq!(
            clearable_text(Some(" 555-0100 ".to_string())),
            Some(Some("555-0100".to_string()))
        );
    }
}
