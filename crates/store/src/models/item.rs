//! Item catalogue domain types.

use serde::{Deserialize, Serialize};

use washline_core::{ItemId, Timestamps, UserId};

use super::{clearable_text, optional_text, required_text};
use crate::error::ValidationErrors;

/// A garment or article type the business handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub created_by: UserId,
    pub timestamp: Timestamps,
}

const fn default_quantity() -> u32 {
    1
}

/// Input for creating an item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl ItemInput {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: None,
            quantity: default_quantity(),
        }
    }

    /// Validate and normalise the input.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", &self.name);

        errors.into_result(Self {
            name,
            description: optional_text(self.description),
            category: optional_text(self.category),
            quantity: self.quantity,
        })
    }
}

/// Partial update of an item; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    /// Empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
    /// Empty string clears the category.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl ItemUpdate {
    /// Validate and normalise the update.
    ///
    /// # Errors
    ///
    /// Returns every field problem found.
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self
            .name
            .map(|name| required_text(&mut errors, "name", &name));

        errors.into_result(Self {
            name,
            description: clearable_text(self.description).map(Option::unwrap_or_default),
            category: clearable_text(self.category).map(Option::unwrap_or_default),
            quantity: self.quantity,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_defaults_to_one() {
        let input: ItemInput = serde_json::from_str(r#"{"name": "Duvet"}"#).unwrap();
        assert_eq!(input.quantity, 1);
    }

    #[test]
    fn test_negative_quantity_rejected_by_type() {
        let input: Result<ItemInput, _> =
            serde_json::from_str(r#"{"name": "Duvet", "quantity": -2}"#);
        assert!(input.is_err());
    }

    #[test]
    fn test_validate_trims() {
        let item = ItemInput {
            category: Some(" bedding ".to_string()),
            ..ItemInput::named(" Duvet ")
        }
        .validate()
        .unwrap();
        assert_eq!(item.name, "Duvet");
        assert_eq!(item.category.as_deref(), Some("bedding"));
    }
}
