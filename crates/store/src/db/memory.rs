//! In-process document store.
//!
//! A batch is validated against a staged overlay while holding the write lock
//! and only then published, so readers never observe a partially applied
//! batch.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    BackendError, Collection, Document, DocumentData, DocumentStore, Filter, WriteBatch, WriteOp,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    version: i64,
    data: DocumentData,
}

type Collections = HashMap<Collection, BTreeMap<String, StoredDocument>>;

/// Document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    offline: AtomicBool,
    commits: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate losing (or regaining) the connection to the storage engine.
    ///
    /// While offline every call fails with `BackendError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of batches committed successfully so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

fn to_document(id: &str, stored: &StoredDocument) -> Document {
    Document {
        id: id.to_owned(),
        version: stored.version,
        data: stored.data.clone(),
    }
}

/// Resolve the current state of a document, preferring staged writes.
fn current<'a>(
    collections: &'a Collections,
    staged: &'a HashMap<(Collection, String), Option<StoredDocument>>,
    collection: Collection,
    id: &str,
) -> Option<&'a StoredDocument> {
    match staged.get(&(collection, id.to_owned())) {
        Some(entry) => entry.as_ref(),
        None => collections.get(&collection).and_then(|docs| docs.get(id)),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), BackendError> {
        self.ensure_online()
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, BackendError> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|stored| to_document(id, stored)))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, stored)| to_document(id, stored))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn query(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, BackendError> {
        self.ensure_online()?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, stored)| filter.matches(&stored.data))
                    .map(|(id, stored)| to_document(id, stored))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError> {
        self.ensure_online()?;
        let mut collections = self.collections.write().await;
        let mut staged: HashMap<(Collection, String), Option<StoredDocument>> = HashMap::new();

        for op in batch.into_ops() {
            match op {
                WriteOp::Create {
                    collection,
                    id,
                    data,
                } => {
                    if current(&collections, &staged, collection, &id).is_some() {
                        return Err(BackendError::AlreadyExists { collection, id });
                    }
                    staged.insert((collection, id), Some(StoredDocument { version: 1, data }));
                }
                WriteOp::Update {
                    collection,
                    id,
                    changes,
                    precondition,
                } => {
                    let Some(existing) = current(&collections, &staged, collection, &id) else {
                        return Err(precondition.missing(collection, id));
                    };
                    precondition.check(collection, &id, existing.version)?;
                    let mut next = existing.clone();
                    changes.apply_to(&mut next.data);
                    next.version += 1;
                    staged.insert((collection, id), Some(next));
                }
                WriteOp::Delete {
                    collection,
                    id,
                    precondition,
                } => {
                    let Some(existing) = current(&collections, &staged, collection, &id) else {
                        return Err(precondition.missing(collection, id));
                    };
                    precondition.check(collection, &id, existing.version)?;
                    staged.insert((collection, id), None);
                }
            }
        }

        for ((collection, id), entry) in staged {
            let docs = collections.entry(collection).or_default();
            match entry {
                Some(stored) => {
                    docs.insert(id, stored);
                }
                None => {
                    docs.remove(&id);
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }
}
