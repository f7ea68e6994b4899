//! Document database access.
//!
//! # Model
//!
//! Data lives in named collections of schema-flexible JSON documents addressed
//! by string ids. Every document carries a storage-level `version` that starts
//! at 1 and increments on each write, which callers use as an optimistic
//! concurrency precondition.
//!
//! ## Collections
//!
//! - `clients` - Laundry customers, owning an ordered `contacts` id list
//! - `contacts` - People at a client, with an optional `clientId` back-reference
//! - `jobs` - Laundry jobs (plain `clientId` foreign key, never synchronised)
//! - `items` - Item catalogue
//! - `services` - Priced services
//! - `users` - Staff accounts
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process, used by tests and the `memory` backend
//! - [`PgDocumentStore`] - `PostgreSQL` `JSONB` table, migrations in
//!   `crates/store/migrations/`, run via:
//!
//! ```bash
//! cargo run -p washline-cli -- migrate
//! ```
//!
//! All mutations go through [`DocumentStore::commit`], which applies a
//! [`WriteBatch`] all-or-nothing.

pub mod batch;
pub mod memory;
pub mod postgres;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use batch::{FieldChange, FieldChanges, Precondition, WriteBatch, WriteOp};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// JSON object stored as a document body.
pub type DocumentData = Map<String, Value>;

/// A named group of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Clients,
    Contacts,
    Jobs,
    Items,
    Services,
    Users,
}

impl Collection {
    /// Every collection the store manages.
    pub const ALL: [Self; 6] = [
        Self::Clients,
        Self::Contacts,
        Self::Jobs,
        Self::Items,
        Self::Services,
        Self::Users,
    ];

    /// Collection name as persisted.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Contacts => "contacts",
            Self::Jobs => "jobs",
            Self::Items => "items",
            Self::Services => "services",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document with its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub version: i64,
    pub data: DocumentData,
}

impl Document {
    /// Top-level field of the document body.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Predicate for [`DocumentStore::query`], evaluated on top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the value.
    Eq { field: String, value: Value },
    /// Field is an array containing the value.
    ArrayContains { field: String, value: Value },
    /// Field is absent or `null`.
    IsNull { field: String },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::ArrayContains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
        }
    }

    /// Evaluate the filter against a document body.
    #[must_use]
    pub fn matches(&self, data: &DocumentData) -> bool {
        match self {
            Self::Eq { field, value } => data.get(field) == Some(value),
            Self::ArrayContains { field, value } => data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
            Self::IsNull { field } => data.get(field).is_none_or(Value::is_null),
        }
    }
}

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write addressed a document that does not exist.
    #[error("document {collection}/{id} does not exist")]
    NotFound { collection: Collection, id: String },

    /// A create addressed an id that is already taken.
    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: Collection, id: String },

    /// A version precondition failed.
    #[error(
        "document {collection}/{id} was modified concurrently (expected version {expected}, found {actual})"
    )]
    Conflict {
        collection: Collection,
        id: String,
        expected: i64,
        actual: i64,
    },

    /// A version-guarded write found its document gone.
    #[error("document {collection}/{id} was deleted concurrently (expected version {expected})")]
    Deleted {
        collection: Collection,
        id: String,
        expected: i64,
    },

    /// The database aborted the transaction to break a lock cycle or a
    /// serialization failure.
    #[error("transaction aborted: {0}")]
    Aborted(String),

    /// A document body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other database error.
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl BackendError {
    /// Whether retrying the read-modify-write cycle may succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::Deleted { .. } | Self::Aborted(_)
        )
    }
}

/// `deadlock_detected` and `serialization_failure`.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40P01", "40001"];

fn is_retryable_sqlstate(code: Option<&str>) -> bool {
    code.is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code))
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            sqlx::Error::Database(ref db) if is_retryable_sqlstate(db.code().as_deref()) => {
                Self::Aborted(db.message().to_owned())
            }
            other => Self::Database(other),
        }
    }
}

/// Create/read/update/delete/query primitives plus an atomic write batch.
///
/// Implementations must apply [`DocumentStore::commit`] all-or-nothing: if any
/// operation in the batch fails, none of its writes become visible.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for log context.
    fn backend_name(&self) -> &'static str;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Fetch one document.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, BackendError>;

    /// Fetch several documents, preserving the order of `ids`.
    async fn get_many(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<Option<Document>>, BackendError> {
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            docs.push(self.get(collection, id).await?);
        }
        Ok(docs)
    }

    /// Every document in a collection, ordered by id.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError>;

    /// Documents matching a filter, ordered by id.
    async fn query(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, BackendError>;

    /// Apply a batch atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError>;
}

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}
