//! Atomic multi-document write batches.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use super::{BackendError, Collection, DocumentData};

/// Change applied to one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Set(Value),
    Delete,
}

/// Field patch for an update; unmentioned fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldChanges(BTreeMap<String, FieldChange>);

impl FieldChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to an already-encoded JSON value.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), FieldChange::Set(value.into()));
        self
    }

    /// Set a field to the JSON encoding of `value`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Serialization` if `value` cannot be encoded.
    pub fn set_serialized<T: Serialize + ?Sized>(
        self,
        field: impl Into<String>,
        value: &T,
    ) -> Result<Self, BackendError> {
        Ok(self.set(field, serde_json::to_value(value)?))
    }

    /// Remove a field from the document.
    #[must_use]
    pub fn delete(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), FieldChange::Delete);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.0.iter()
    }

    /// Apply the patch to a document body in place.
    pub fn apply_to(&self, data: &mut DocumentData) {
        for (field, change) in &self.0 {
            match change {
                FieldChange::Set(value) => {
                    data.insert(field.clone(), value.clone());
                }
                FieldChange::Delete => {
                    data.remove(field);
                }
            }
        }
    }
}

/// Guard evaluated against the current document before a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The document must exist.
    Exists,
    /// The document must exist at exactly this version.
    Version(i64),
}

impl Precondition {
    /// Check the guard against the stored version.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` when a version guard does not match.
    pub fn check(self, collection: Collection, id: &str, actual: i64) -> Result<(), BackendError> {
        match self {
            Self::Version(expected) if expected != actual => Err(BackendError::Conflict {
                collection,
                id: id.to_owned(),
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Error for a guarded write whose document no longer exists.
    ///
    /// A version guard means the caller read the document, so its absence is
    /// a concurrent delete and the cycle can be re-planned.
    #[must_use]
    pub const fn missing(self, collection: Collection, id: String) -> BackendError {
        match self {
            Self::Version(expected) => BackendError::Deleted {
                collection,
                id,
                expected,
            },
            Self::Exists => BackendError::NotFound { collection, id },
        }
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert a new document; fails if the id is taken.
    Create {
        collection: Collection,
        id: String,
        data: DocumentData,
    },
    /// Patch an existing document; fails if it does not exist.
    Update {
        collection: Collection,
        id: String,
        changes: FieldChanges,
        precondition: Precondition,
    },
    /// Remove an existing document; fails if it does not exist.
    Delete {
        collection: Collection,
        id: String,
        precondition: Precondition,
    },
}

impl WriteOp {
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Create { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => *collection,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }
}

/// Ordered set of writes committed as a single all-or-nothing unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, collection: Collection, id: impl Into<String>, data: DocumentData) {
        self.ops.push(WriteOp::Create {
            collection,
            id: id.into(),
            data,
        });
    }

    pub fn update(&mut self, collection: Collection, id: impl Into<String>, changes: FieldChanges) {
        self.ops.push(WriteOp::Update {
            collection,
            id: id.into(),
            changes,
            precondition: Precondition::Exists,
        });
    }

    /// Update guarded by the version observed when the document was read.
    pub fn update_if_version(
        &mut self,
        collection: Collection,
        id: impl Into<String>,
        changes: FieldChanges,
        version: i64,
    ) {
        self.ops.push(WriteOp::Update {
            collection,
            id: id.into(),
            changes,
            precondition: Precondition::Version(version),
        });
    }

    pub fn delete(&mut self, collection: Collection, id: impl Into<String>) {
        self.ops.push(WriteOp::Delete {
            collection,
            id: id.into(),
            precondition: Precondition::Exists,
        });
    }

    /// Delete guarded by the version observed when the document was read.
    pub fn delete_if_version(&mut self, collection: Collection, id: impl Into<String>, version: i64) {
        self.ops.push(WriteOp::Delete {
            collection,
            id: id.into(),
            precondition: Precondition::Version(version),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of writes addressed to one collection.
    #[must_use]
    pub fn count_for(&self, collection: Collection) -> usize {
        self.ops
            .iter()
            .filter(|op| op.collection() == collection)
            .count()
    }

    /// Existing documents the batch writes, sorted and deduplicated.
    ///
    /// Backends that lock rows take them in this order so two batches over
    /// the same documents cannot wait on each other.
    #[must_use]
    pub fn lock_order(&self) -> Vec<(Collection, &str)> {
        let keys: BTreeSet<(Collection, &str)> = self
            .ops
            .iter()
            .filter(|op| !matches!(op, WriteOp::Create { .. }))
            .map(|op| (op.collection(), op.id()))
            .collect();
        keys.into_iter().collect()
    }
}
