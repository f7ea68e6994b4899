//! Integration tests for Washline.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory suites
//! cargo test -p washline-integration-tests
//!
//! # Including the PostgreSQL suite
//! WASHLINE_TEST_DATABASE_URL=postgres://localhost/washline_test \
//!     cargo test -p washline-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `relationship` - Client/contact reference properties against `MemoryStore`
//! - `concurrency` - Version-guarded batches under interfering writes
//! - `postgres` - The same protocol against a real database (ignored by default)

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use washline_store::EntityStore;
use washline_store::db::{
    BackendError, Collection, Document, DocumentStore, Filter, MemoryStore, WriteBatch,
};
use washline_store::models::{Contact, ContactInput};

/// A fresh in-memory store plus a handle on its backend.
#[must_use]
pub fn memory_store() -> (Arc<MemoryStore>, EntityStore) {
    let backend = Arc::new(MemoryStore::new());
    let store = EntityStore::new(backend.clone());
    (backend, store)
}

/// Create an unassigned contact.
///
/// # Panics
///
/// Panics if the store rejects the contact.
pub async fn create_contact(store: &EntityStore, name: &str) -> Contact {
    store
        .contacts()
        .create_contact(ContactInput {
            name: name.to_string(),
            ..ContactInput::default()
        })
        .await
        .expect("Failed to create test contact")
}

/// Storage version of a document, `None` if it does not exist.
///
/// # Panics
///
/// Panics if the backend cannot be read.
pub async fn version_of(store: &EntityStore, collection: Collection, id: &str) -> Option<i64> {
    store
        .backend()
        .get(collection, id)
        .await
        .expect("Failed to read document")
        .map(|doc| doc.version)
}

/// Database URL for the `PostgreSQL` suite.
#[must_use]
pub fn test_database_url() -> Option<String> {
    std::env::var("WASHLINE_TEST_DATABASE_URL").ok()
}

/// Builds the write another writer lands just before a commit.
pub type Interference = Box<dyn Fn() -> WriteBatch + Send + Sync>;

/// Wraps a store and commits an interfering batch ahead of the next
/// `times` commits, simulating a concurrent writer between read and commit.
pub struct InterferingStore {
    inner: Arc<MemoryStore>,
    interference: Interference,
    remaining: AtomicU32,
}

impl InterferingStore {
    #[must_use]
    pub fn new(inner: Arc<MemoryStore>, times: u32, interference: Interference) -> Self {
        Self {
            inner,
            interference,
            remaining: AtomicU32::new(times),
        }
    }

    /// Interfering commits still to come.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InterferingStore {
    fn backend_name(&self) -> &'static str {
        "interfering"
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.inner.ping().await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, BackendError> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        self.inner.list(collection).await
    }

    async fn query(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, BackendError> {
        self.inner.query(collection, filter).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError> {
        let interfere = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if interfere {
            self.inner.commit((self.interference)()).await?;
        }
        self.inner.commit(batch).await
    }
}
