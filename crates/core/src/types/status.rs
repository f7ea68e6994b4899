//! Enumerations stored on documents.
//!
//! Every enum serialises as `snake_case` and round-trips through
//! `Display`/`FromStr` with the same spelling, so the CLI and the stored JSON
//! agree on one vocabulary.

use serde::{Deserialize, Serialize};

macro_rules! string_enum {
    ($name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The stored spelling of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// All values, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $what, ": {}"), s)),
                }
            }
        }
    };
}

/// Kind of laundry customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// A private household.
    #[default]
    Residential,
    /// Offices, shops and other businesses.
    Commercial,
    /// Hotels, restaurants and short-term rentals.
    Hospitality,
    /// Clinics, care homes and hospitals.
    Healthcare,
}

string_enum!(ClientType, "client type" {
    Residential => "residential",
    Commercial => "commercial",
    Hospitality => "hospitality",
    Healthcare => "healthcare",
});

/// Role a contact plays for its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    #[default]
    Primary,
    Billing,
    Operations,
    Other,
}

string_enum!(ContactType, "contact type" {
    Primary => "primary",
    Billing => "billing",
    Operations => "operations",
    Other => "other",
});

/// Progress of a laundry job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    InProgress,
    Ready,
    Delivered,
    Cancelled,
}

string_enum!(JobStatus, "job status" {
    Pending => "pending",
    InProgress => "in_progress",
    Ready => "ready",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl JobStatus {
    /// Whether the job has left the workflow.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// Staff role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Full access including staff management.
    Admin,
    /// Manages clients, jobs and services.
    Manager,
    /// Works jobs day to day.
    #[default]
    Staff,
}

string_enum!(StaffRole, "staff role" {
    Admin => "admin",
    Manager => "manager",
    Staff => "staff",
});

/// How a service is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceUnit {
    #[default]
    PerItem,
    PerKg,
    Flat,
}

string_enum!(ServiceUnit, "service unit" {
    PerItem => "per_item",
    PerKg => "per_kg",
    Flat => "flat",
});
