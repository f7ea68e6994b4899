//! Staff user domain types.

use serde::{Deserialize, Serialize};

use washline_core::{Email, StaffRole, Timestamps, UserId};

use super::{clearable_text, optional_text, required_text};
use crate::error::ValidationErrors;

/// A staff member with dashboard access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default = "default_active")]
    pub active: bool,
    pub timestamp: Timestamps,
}

const fn default_active() -> bool {
    true
}

/// Input for creating a staff user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: StaffRole,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A validated [`UserInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub active: bool,
}

impl UserInput {
    /// Validate and normalise the input.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<NewUser, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", &self.name);
        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.add("email", e.to_string());
                None
            }
        };

        match email {
            Some(email) if errors.is_empty() => Ok(NewUser {
                name,
                email,
                phone: optional_text(self.phone),
                role: self.role,
                active: self.active,
            }),
            _ => Err(errors),
        }
    }
}

/// Partial update of a staff user; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Empty string clears the phone number.
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<StaffRole>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// A validated [`UserUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub phone: Option<Option<String>>,
    pub role: Option<StaffRole>,
    pub active: Option<bool>,
}

impl UserUpdate {
    /// Validate and normalise the update.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<UserChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", &name));
        let email = match self.email.as_deref().map(Email::parse) {
            Some(Ok(email)) => Some(email),
            Some(Err(e)) => {
                errors.add("email", e.to_string());
                None
            }
            None => None,
        };

        errors.into_result(UserChanges {
            name,
            email,
            phone: clearable_text(self.phone),
            role: self.role,
            active: self.active,
        })
    }
}
