//! Typed repositories over the document store.
//!
//! Each repository borrows the backend and turns entity operations into
//! document reads and atomic [`WriteBatch`]es. Entities are stored as their
//! camelCase JSON encoding with the `id` lifted out into the document key.

pub mod clients;
pub mod contacts;
pub mod items;
pub mod jobs;
pub mod services;
pub mod users;

use std::future::Future;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use washline_core::Timestamps;

use crate::db::{Collection, Document, DocumentData, DocumentStore, FieldChanges, WriteBatch};
use crate::error::StoreError;

pub use clients::ClientRepository;
pub use contacts::ContactRepository;
pub use items::ItemRepository;
pub use jobs::JobRepository;
pub use services::ServiceRepository;
pub use users::UserRepository;

/// Retries after a version conflict before giving up.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Tunables shared by every repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How many times a read-modify-write cycle is re-run after a conflict.
    pub conflict_retries: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }
}

/// An entity together with the document version it was read at.
#[derive(Debug, Clone)]
pub(crate) struct Versioned<T> {
    pub entity: T,
    pub version: i64,
}

/// Decode a stored document into an entity.
pub(crate) fn decode<T: DeserializeOwned>(
    collection: Collection,
    doc: Document,
) -> Result<T, StoreError> {
    let Document { id, mut data, .. } = doc;
    data.insert("id".to_owned(), Value::String(id.clone()));
    serde_json::from_value(Value::Object(data)).map_err(|e| {
        StoreError::DataCorruption(format!("invalid {collection} document {id}: {e}"))
    })
}

pub(crate) fn decode_versioned<T: DeserializeOwned>(
    collection: Collection,
    doc: Document,
) -> Result<Versioned<T>, StoreError> {
    let version = doc.version;
    Ok(Versioned {
        entity: decode(collection, doc)?,
        version,
    })
}

pub(crate) fn decode_all<T: DeserializeOwned>(
    collection: Collection,
    docs: Vec<Document>,
) -> Result<Vec<T>, StoreError> {
    docs.into_iter().map(|doc| decode(collection, doc)).collect()
}

/// Encode an entity as a document body, without its `id`.
pub(crate) fn encode<T: Serialize>(entity: &T) -> Result<DocumentData, StoreError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(mut data)) => {
            data.remove("id");
            Ok(data)
        }
        Ok(other) => Err(StoreError::OperationFailed(format!(
            "entity encoded as {other} instead of an object"
        ))),
        Err(e) => Err(StoreError::OperationFailed(format!(
            "failed to encode entity: {e}"
        ))),
    }
}

/// Add a `Set` for a field that is being changed.
pub(crate) fn patch<T: Serialize + ?Sized>(
    changes: FieldChanges,
    field: &str,
    value: Option<&T>,
) -> Result<FieldChanges, StoreError> {
    match value {
        Some(value) => Ok(changes.set_serialized(field, value)?),
        None => Ok(changes),
    }
}

/// Add a `Set` or `Delete` for an optional field that is being changed.
pub(crate) fn patch_clearable<T: Serialize + ?Sized>(
    changes: FieldChanges,
    field: &str,
    value: Option<Option<&T>>,
) -> Result<FieldChanges, StoreError> {
    match value {
        Some(Some(value)) => Ok(changes.set_serialized(field, value)?),
        Some(None) => Ok(changes.delete(field)),
        None => Ok(changes),
    }
}

pub(crate) async fn read_entity<T: DeserializeOwned>(
    backend: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> Result<Option<Versioned<T>>, StoreError> {
    backend
        .get(collection, id)
        .await?
        .map(|doc| decode_versioned(collection, doc))
        .transpose()
}

pub(crate) async fn get_entity<T: DeserializeOwned>(
    backend: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> Result<T, StoreError> {
    read_entity(backend, collection, id)
        .await?
        .map(|versioned| versioned.entity)
        .ok_or_else(|| StoreError::not_found(collection, id))
}

pub(crate) async fn list_entities<T: DeserializeOwned>(
    backend: &dyn DocumentStore,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    decode_all(collection, backend.list(collection).await?)
}

pub(crate) async fn insert_entity<T: Serialize>(
    backend: &dyn DocumentStore,
    collection: Collection,
    id: &str,
    entity: &T,
) -> Result<(), StoreError> {
    let mut batch = WriteBatch::new();
    batch.create(collection, id, encode(entity)?);
    Ok(backend.commit(batch).await?)
}

/// Read, patch and commit one document under a version guard.
///
/// `changes` builds the patch from the entity as read and runs again on every
/// re-plan. The stored entity is returned after the commit.
pub(crate) async fn update_entity<T, F>(
    backend: &dyn DocumentStore,
    options: StoreOptions,
    collection: Collection,
    id: &str,
    changes: F,
) -> Result<T, StoreError>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<FieldChanges, StoreError>,
{
    let changes = &changes;
    commit_with_retry(backend, options, "update", move || async move {
        let Some(Versioned { entity, version }) = read_entity::<T>(backend, collection, id).await?
        else {
            return Err(StoreError::not_found(collection, id));
        };
        let mut batch = WriteBatch::new();
        batch.update_if_version(collection, id, changes(&entity)?, version);
        Ok::<_, StoreError>((batch, ()))
    })
    .await?;

    get_entity(backend, collection, id).await
}

/// Add a `timestamp` with `updatedAt` moved to now.
pub(crate) fn touched(
    fields: FieldChanges,
    mut timestamp: Timestamps,
) -> Result<FieldChanges, StoreError> {
    timestamp.touch(Utc::now());
    Ok(fields.set_serialized("timestamp", &timestamp)?)
}

pub(crate) async fn delete_entity(
    backend: &dyn DocumentStore,
    collection: Collection,
    id: &str,
) -> Result<(), StoreError> {
    if backend.get(collection, id).await?.is_none() {
        return Err(StoreError::not_found(collection, id));
    }
    let mut batch = WriteBatch::new();
    batch.delete(collection, id);
    Ok(backend.commit(batch).await?)
}

/// Clearable text from a validated update: `""` means clear the field.
pub(crate) fn clear_on_empty(value: Option<&String>) -> Option<Option<&String>> {
    value.map(|text| Some(text).filter(|t| !t.is_empty()))
}

/// Case-insensitive name ordering with the id as tie-breaker.
pub(crate) fn name_order(name: &str, id: &str) -> (String, String) {
    (name.to_lowercase(), id.to_owned())
}

/// Run a read-plan-commit cycle, re-planning after version conflicts.
///
/// `plan` reads whatever it needs and returns the batch to commit together
/// with the value to hand back on success. An empty batch is not committed.
pub(crate) async fn commit_with_retry<T, F, Fut>(
    backend: &dyn DocumentStore,
    options: StoreOptions,
    operation: &'static str,
    mut plan: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(WriteBatch, T), StoreError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        let (batch, outcome) = plan().await?;
        if batch.is_empty() {
            return Ok(outcome);
        }

        match backend.commit(batch).await {
            Ok(()) => return Ok(outcome),
            Err(err) if err.is_conflict() && attempt <= options.conflict_retries => {
                warn!(operation, attempt, error = %err, "Concurrent modification, retrying");
            }
            Err(err) if err.is_conflict() => {
                return Err(StoreError::OperationFailed(format!(
                    "{operation} abandoned after {attempt} attempts: {err}"
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::db::MemoryStore;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: String,
        name: String,
    }

    #[test]
    fn test_decode_lifts_id_from_key() {
        let doc = Document {
            id: "w1".to_string(),
            version: 4,
            data: json!({"name": "Press"}).as_object().unwrap().clone(),
        };
        let versioned: Versioned<Widget> = decode_versioned(Collection::Items, doc).unwrap();
        assert_eq!(versioned.entity.id, "w1");
        assert_eq!(versioned.version, 4);
    }

    #[test]
    fn test_decode_reports_corruption() {
        let doc = Document {
            id: "w1".to_string(),
            version: 1,
            data: json!({"name": 12}).as_object().unwrap().clone(),
        };
        let err = decode::<Widget>(Collection::Items, doc).unwrap_err();
        assert!(matches!(err, StoreError::DataCorruption(ref msg) if msg.contains("items document w1")));
    }

    #[test]
    fn test_encode_drops_id() {
        let data = encode(&Widget {
            id: "w1".to_string(),
            name: "Press".to_string(),
        })
        .unwrap();
        assert!(!data.contains_key("id"));
        assert_eq!(data.get("name"), Some(&json!("Press")));
    }

    #[test]
    fn test_patch_clearable() {
        let changes = patch_clearable::<str>(FieldChanges::new(), "phone", Some(None)).unwrap();
        let changes = patch_clearable(changes, "email", Some(Some("a@b.co"))).unwrap();
        let changes = patch_clearable::<str>(changes, "name", None).unwrap();

        let mut data = json!({"phone": "1", "name": "kept"}).as_object().unwrap().clone();
        changes.apply_to(&mut data);
        assert!(!data.contains_key("phone"));
        assert_eq!(data.get("email"), Some(&json!("a@b.co")));
        assert_eq!(data.get("name"), Some(&json!("kept")));
    }

    #[tokio::test]
    async fn test_commit_with_retry_gives_up_on_persistent_conflict() {
        let store = MemoryStore::new();
        let mut seed = WriteBatch::new();
        seed.create(Collection::Items, "w1", DocumentData::new());
        store.commit(seed).await.unwrap();

        let attempts = &AtomicU32::new(0);
        let options = StoreOptions {
            conflict_retries: 2,
        };
        let result: Result<(), _> = commit_with_retry(&store, options, "touch widget", move || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            let mut batch = WriteBatch::new();
            batch.update_if_version(Collection::Items, "w1", FieldChanges::new(), 99);
            Ok::<_, StoreError>((batch, ()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::OperationFailed(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_update_entity_guards_version() {
        let store = MemoryStore::new();
        let mut seed = WriteBatch::new();
        seed.create(Collection::Items, "w1", encode(&json!({"name": "Press"})).unwrap());
        store.commit(seed).await.unwrap();

        let widget: Widget = update_entity(
            &store,
            StoreOptions::default(),
            Collection::Items,
            "w1",
            |current: &Widget| Ok(FieldChanges::new().set("name", format!("{} v2", current.name))),
        )
        .await
        .unwrap();

        assert_eq!(widget.name, "Press v2");
        let doc = store.get(Collection::Items, "w1").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
    }

    #[tokio::test]
    async fn test_update_entity_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = update_entity::<Widget, _>(
            &store,
            StoreOptions::default(),
            Collection::Items,
            "ghost",
            |_| Ok(FieldChanges::new()),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_commit_with_retry_skips_empty_batch() {
        let store = MemoryStore::new();
        let value = commit_with_retry(&store, StoreOptions::default(), "noop", || async {
            Ok::<_, StoreError>((WriteBatch::new(), 7))
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(store.commit_count(), 0);
    }
}
