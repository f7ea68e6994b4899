//! Core types for Washline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod actor;
pub mod email;
pub mod id;
pub mod price;
pub mod status;
pub mod timestamps;

pub use actor::Actor;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
pub use timestamps::Timestamps;
