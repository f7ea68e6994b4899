//! Contact domain types.
//!
//! Neither [`ContactInput`] nor [`ContactUpdate`] has a `clientId` field: the
//! back-reference is owned by the client side and only changes through client
//! create, update and delete.

use serde::{Deserialize, Serialize};

use washline_core::{ClientId, ContactId, ContactType, Email, Timestamps};

use super::{Address, clearable_text, optional_email, optional_text, required_text};
use crate::error::ValidationErrors;

/// A person at (or available to) a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub contact_type: ContactType,
    /// Owning client, absent while the contact is unassigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    pub timestamp: Timestamps,
}

impl Contact {
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.client_id.is_some()
    }
}

/// Input for creating a contact. New contacts start unassigned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub contact_type: ContactType,
}

/// A validated [`ContactInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub contact_type: ContactType,
}

impl ContactInput {
    /// Validate and normalise the input.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<NewContact, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", &self.name);
        let email = optional_email(&mut errors, "email", self.email.as_deref());

        errors.into_result(NewContact {
            name,
            email,
            phone: optional_text(self.phone),
            address: self.address.and_then(Address::normalized),
            contact_type: self.contact_type,
        })
    }
}

/// Partial update of a contact; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub contact_type: Option<ContactType>,
}

/// A validated [`ContactUpdate`]. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub email: Option<Option<Email>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<Address>>,
    pub contact_type: Option<ContactType>,
}

impl ContactUpdate {
    /// Validate and normalise the update.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<ContactChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", &name));
        let email = self
            .email
            .map(|email| optional_email(&mut errors, "email", Some(email.as_str())));

        errors.into_result(ContactChanges {
            name,
            email,
            phone: clearable_text(self.phone),
            address: self.address.map(Address::normalized),
            contact_type: self.contact_type,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_is_not_settable_through_input() {
        let create: Result<ContactInput, _> =
            serde_json::from_str(r#"{"name": "Ana", "clientId": "c1"}"#);
        assert!(create.is_err());

        let update: Result<ContactUpdate, _> = serde_json::from_str(r#"{"clientId": "c1"}"#);
        assert!(update.is_err());
    }

    #[test]
    fn test_validate() {
        let input = ContactInput {
            name: " Ana Ruiz ".to_string(),
            email: Some("ana@example.com".to_string()),
            contact_type: ContactType::Billing,
            ..ContactInput::default()
        };
        let contact = input.validate().unwrap();
        assert_eq!(contact.name, "Ana Ruiz");
        assert_eq!(contact.email.unwrap().as_str(), "ana@example.com");
        assert_eq!(contact.contact_type, ContactType::Billing);
    }

    #[test]
    fn test_stored_shape_omits_missing_client() {
        let contact: Contact = serde_json::from_str(
            r#"{"id": "k1", "name": "Ana", "timestamp": {"createdAt": "2026-03-01T09:00:00Z", "updatedAt": "2026-03-01T09:00:00Z"}}"#,
        )
        .unwrap();
        assert!(!contact.is_assigned());

        let json = serde_json::to_value(&contact).unwrap();
        assert!(json.get("clientId").is_none());
        assert_eq!(json["contactType"], "primary");
    }
}
