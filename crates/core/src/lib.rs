//! Washline Core - Shared types library.
//!
//! This crate provides common types used across all Washline components:
//! - `store` - Relationship-consistent entity store over a document database
//! - `cli` - Command-line tools for migrations, seeding and maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows the presentation layer
//! to share the exact types the store accepts and returns.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for document IDs, prices, emails, timestamps
//!   and the enumerations used by the laundry dashboard

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
