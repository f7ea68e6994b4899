//! Priced service domain types.

use serde::{Deserialize, Serialize};

use washline_core::{Price, ServiceId, ServiceUnit, Timestamps, UserId};

use super::{clearable_text, optional_text, required_text};
use crate::error::ValidationErrors;

/// Something the business sells, e.g. "Wash & fold" per kilogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub unit: ServiceUnit,
    #[serde(default = "default_active")]
    pub active: bool,
    pub created_by: UserId,
    pub timestamp: Timestamps,
}

const fn default_active() -> bool {
    true
}

/// Input for creating a service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub unit: ServiceUnit,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn check_price(errors: &mut ValidationErrors, price: &Price) {
    if price.is_negative() {
        errors.add("price", "must not be negative");
    }
}

impl ServiceInput {
    #[must_use]
    pub fn new(name: impl Into<String>, price: Price, unit: ServiceUnit) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            unit,
            active: true,
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
        check_price(&mut errors, &self.price);

        errors.into_result(Self {
            name,
            description: optional_text(self.description),
            ..self
        })
    }
}

/// Partial update of a service; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceUpdate {
    #[serde(default)]
    pub name: Option<String>,
    /// Empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub unit: Option<ServiceUnit>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ServiceUpdate {
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
        if let Some(price) = &self.price {
            check_price(&mut errors, price);
        }

        errors.into_result(Self {
            name,
            description: clearable_text(self.description).map(Option::unwrap_or_default),
            ..self
        })
    }
}
