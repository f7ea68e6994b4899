//! Washline Store - Relationship-consistent entity store.
//!
//! Entities live as JSON documents in a [`db::DocumentStore`]. Clients and
//! contacts reference each other from both sides: a client holds an ordered
//! `contacts` list and each contact holds an optional `clientId`. The
//! repositories keep both sides in agreement by staging every related write
//! into one version-guarded batch and re-planning on conflict.
//!
//! # Modules
//!
//! - [`db`] - Document store trait, write batches, memory and `PostgreSQL` backends
//! - [`models`] - Entity documents and their validated inputs
//! - [`relationship`] - Reference list normalisation and diffing
//! - [`repositories`] - CRUD per collection
//! - [`audit`] - Read-only check of the client/contact invariant
//! - [`seed`] - YAML fixture loading
//! - [`config`] - Environment configuration
//!
//! # Example
//!
//! ```rust,ignore
//! let store = EntityStore::connect(&StoreConfig::from_env()?).await?;
//! let client = store.clients().create_client(input).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod relationship;
pub mod repositories;
pub mod seed;
pub mod store;

pub use audit::{AuditReport, ReferenceIssue, audit_references};
pub use config::{ConfigError, LogFormat, StoreConfig};
pub use error::{StoreError, ValidationErrors};
pub use repositories::StoreOptions;
pub use seed::{SeedError, SeedFile, SeedSummary, load_seed};
pub use store::EntityStore;
