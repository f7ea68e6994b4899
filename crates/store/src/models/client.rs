//! Client domain types.

use serde::{Deserialize, Serialize};

use washline_core::{ClientId, ClientType, ContactId, Email, Timestamps};

use super::{Address, clearable_text, optional_email, optional_text, required_text};
use crate::error::ValidationErrors;
use crate::relationship::{
    deserialize_optional_reference_list, deserialize_reference_list, normalize_references,
};

/// A laundry customer.
///
/// `contacts` is the authoritative list of the contacts this client owns;
/// every listed contact carries `clientId == id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub client_type: ClientType,
    #[serde(default)]
    pub contacts: Vec<ContactId>,
    pub timestamp: Timestamps,
}

/// Input for creating a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub client_type: ClientType,
    /// Contacts selected on the form; each gets `clientId` set on create.
    #[serde(default, deserialize_with = "deserialize_reference_list")]
    pub contacts: Vec<ContactId>,
}

/// A validated [`ClientInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub client_type: ClientType,
    pub contacts: Vec<ContactId>,
}

impl ClientInput {
    /// Validate and normalise the input.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<NewClient, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", &self.name);
        let email = optional_email(&mut errors, "email", self.email.as_deref());

        errors.into_result(NewClient {
            name,
            email,
            phone: optional_text(self.phone),
            address: self.address.and_then(Address::normalized),
            client_type: self.client_type,
            contacts: normalize_references(self.contacts),
        })
    }
}

/// Partial update of a client; `None` leaves a field untouched.
///
/// For `email` and `phone` an empty string clears the field; an address with
/// every part blank clears the address.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub client_type: Option<ClientType>,
    /// Replacement contact list; the store diffs it against the stored one.
    #[serde(default, deserialize_with = "deserialize_optional_reference_list")]
    pub contacts: Option<Vec<ContactId>>,
}

/// A validated [`ClientUpdate`]. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub email: Option<Option<Email>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<Address>>,
    pub client_type: Option<ClientType>,
    pub contacts: Option<Vec<ContactId>>,
}

impl ClientUpdate {
    /// Replace only the contact list.
    #[must_use]
    pub fn contacts<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ContactId>,
    {
        Self {
            contacts: Some(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Validate and normalise the update.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<ClientChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", &name));
        let email = self
            .email
            .map(|email| optional_email(&mut errors, "email", Some(email.as_str())));

        errors.into_result(ClientChanges {
            name,
            email,
            phone: clearable_text(self.phone),
            address: self.address.map(Address::normalized),
            client_type: self.client_type,
            contacts: self.contacts.map(normalize_references),
        })
    }
}
