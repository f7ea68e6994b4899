//! `PostgreSQL` document store.
//!
//! Documents live in one `documents` table keyed by `(collection, id)` with a
//! `JSONB` body. A batch runs inside one SQL transaction; rows are locked with
//! `SELECT ... FOR UPDATE` before their version is checked and their body
//! patched, so concurrent batches touching the same document serialize.
//! Every row a batch writes is locked up front in key order, which keeps two
//! batches from deadlocking on each other's rows.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use super::{
    BackendError, Collection, Document, DocumentData, DocumentStore, Filter, WriteBatch, WriteOp,
};

/// Internal row type for document queries.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    version: i64,
    data: Json<DocumentData>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            version: row.version,
            data: row.data.0,
        }
    }
}

/// Row lock taken before an update or delete.
#[derive(Debug, sqlx::FromRow)]
struct LockedRow {
    version: i64,
    data: Json<DocumentData>,
}

/// Document store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::migrate::MigrateError` if a migration fails.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn lock_row(
        tx: &mut Transaction<'_, Postgres>,
        collection: Collection,
        id: &str,
    ) -> Result<Option<LockedRow>, BackendError> {
        let row = sqlx::query_as::<_, LockedRow>(
            r"
            SELECT version, data
            FROM documents
            WHERE collection = $1 AND id = $2
            FOR UPDATE
            ",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    async fn apply(tx: &mut Transaction<'_, Postgres>, op: WriteOp) -> Result<(), BackendError> {
        match op {
            WriteOp::Create {
                collection,
                id,
                data,
            } => {
                let result = sqlx::query(
                    r"
                    INSERT INTO documents (collection, id, version, data)
                    VALUES ($1, $2, 1, $3)
                    ON CONFLICT (collection, id) DO NOTHING
                    ",
                )
                .bind(collection.as_str())
                .bind(&id)
                .bind(Json(data))
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(BackendError::AlreadyExists { collection, id });
                }
            }
            WriteOp::Update {
                collection,
                id,
                changes,
                precondition,
            } => {
                let Some(row) = Self::lock_row(tx, collection, &id).await? else {
                    return Err(precondition.missing(collection, id));
                };
                precondition.check(collection, &id, row.version)?;

                let mut data = row.data.0;
                changes.apply_to(&mut data);

                sqlx::query(
                    r"
                    UPDATE documents
                    SET data = $3, version = version + 1, updated_at = NOW()
                    WHERE collection = $1 AND id = $2
                    ",
                )
                .bind(collection.as_str())
                .bind(&id)
                .bind(Json(data))
                .execute(&mut **tx)
                .await?;
            }
            WriteOp::Delete {
                collection,
                id,
                precondition,
            } => {
                let Some(row) = Self::lock_row(tx, collection, &id).await? else {
                    return Err(precondition.missing(collection, id));
                };
                precondition.check(collection, &id, row.version)?;

                sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                    .bind(collection.as_str())
                    .bind(&id)
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, BackendError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, version, data
            FROM documents
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_many(
        &self,
        collection: Collection,
        ids: &[String],
    ) -> Result<Vec<Option<Document>>, BackendError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, version, data
            FROM documents
            WHERE collection = $1 AND id = ANY($2)
            ",
        )
        .bind(collection.as_str())
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut found: std::collections::HashMap<String, Document> = rows
            .into_iter()
            .map(|row| (row.id.clone(), row.into()))
            .collect();

        Ok(ids.iter().map(|id| found.remove(id)).collect())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>, BackendError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT id, version, data
            FROM documents
            WHERE collection = $1
            ORDER BY id
            ",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn query(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, BackendError> {
        let query = match filter {
            Filter::Eq { field, value } => sqlx::query_as::<_, DocumentRow>(
                r"
                SELECT id, version, data
                FROM documents
                WHERE collection = $1 AND data -> $2 = $3
                ORDER BY id
                ",
            )
            .bind(collection.as_str())
            .bind(field)
            .bind(Json(value.clone())),
            Filter::ArrayContains { field, value } => sqlx::query_as::<_, DocumentRow>(
                r"
                SELECT id, version, data
                FROM documents
                WHERE collection = $1
                  AND jsonb_typeof(data -> $2) = 'array'
                  AND data -> $2 @> $3
                ORDER BY id
                ",
            )
            .bind(collection.as_str())
            .bind(field)
            .bind(Json(serde_json::Value::Array(vec![value.clone()]))),
            Filter::IsNull { field } => sqlx::query_as::<_, DocumentRow>(
                r"
                SELECT id, version, data
                FROM documents
                WHERE collection = $1
                  AND (data -> $2 IS NULL OR data -> $2 = 'null'::jsonb)
                ORDER BY id
                ",
            )
            .bind(collection.as_str())
            .bind(field),
        };

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()))]
    async fn commit(&self, batch: WriteBatch) -> Result<(), BackendError> {
        let mut tx = self.pool.begin().await?;

        for (collection, id) in batch.lock_order() {
            Self::lock_row(&mut tx, collection, id).await?;
        }
        for op in batch.into_ops() {
            Self::apply(&mut tx, op).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

