use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, Sqlite};
use uuid::Uuid;

use tenderbid_core::config::DatabaseConfig;

use crate::document::{
    CollectionPath, Document, DocumentId, DocumentPatch, DocumentStore, Filter, StoreError,
};
use crate::feed::{ChangeFeed, Subscription};
use crate::migrations;

pub type DbPool = sqlx::SqlitePool;

/// SQLite-backed adapter. One `documents` table holds every collection; JSON
/// bodies, rowid insertion order, transactions for batch atomicity.
pub struct SqlDocumentStore {
    pool: DbPool,
    feed: Arc<ChangeFeed>,
}

impl SqlDocumentStore {
    /// Opens the configured database with the document store's pragmas
    /// (WAL for concurrent readers, a busy timeout so racing batches wait
    /// instead of erroring) and brings the schema up to date.
    pub async fn connect(database: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(database.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(database.timeout_secs.max(1)))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                    sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                    Ok(())
                })
            })
            .connect(&database.url)
            .await?;
        migrations::run_pending(&pool).await?;

        Ok(Self::new(pool))
    }

    /// Wraps an already-migrated pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool, feed: ChangeFeed::new() }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn snapshot(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let rows =
            sqlx::query("SELECT id, body FROM documents WHERE collection = ? ORDER BY rowid")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.iter()
            .map(|row| {
                let id: String =
                    row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
                let raw: String =
                    row.try_get("body").map_err(|e| StoreError::Decode(e.to_string()))?;
                let body = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Decode(format!("document `{id}`: {e}")))?;
                Ok(Document { id: DocumentId(id), body })
            })
            .collect()
    }

    async fn publish(&self, collection: &CollectionPath) -> Result<(), StoreError> {
        let documents = self.snapshot(collection).await?;
        self.feed.publish(collection, &documents);
        Ok(())
    }

    async fn apply_patches(
        conn: &mut PoolConnection<Sqlite>,
        patches: &[DocumentPatch],
    ) -> Result<(), StoreError> {
        for patch in patches {
            if !patch.fields.is_object() {
                return Err(StoreError::NonObjectBody);
            }

            let current: Option<(String,)> =
                sqlx::query_as("SELECT body FROM documents WHERE collection = ? AND id = ?")
                    .bind(patch.collection.as_str())
                    .bind(patch.id.0.as_str())
                    .fetch_optional(&mut **conn)
                    .await?;
            let Some((raw,)) = current else {
                return Err(StoreError::MissingDocument {
                    collection: patch.collection.to_string(),
                    id: patch.id.0.clone(),
                });
            };

            if let Some(guard) = &patch.guard {
                let body: Value = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Decode(format!("document `{}`: {e}", patch.id.0)))?;
                if body.get(&guard.field) != Some(&guard.expected) {
                    return Err(StoreError::PreconditionFailed {
                        collection: patch.collection.to_string(),
                        id: patch.id.0.clone(),
                        field: guard.field.clone(),
                        expected: guard.expected.to_string(),
                    });
                }
            }

            // The guard is repeated in the WHERE clause so the precondition
            // holds at write time, not just at the read above.
            let result = match &patch.guard {
                Some(guard) => {
                    let path = format!("$.{}", guard.field);
                    let query = sqlx::query(
                        "UPDATE documents SET body = json_patch(body, ?)
                         WHERE collection = ? AND id = ? AND json_extract(body, ?) = ?",
                    )
                    .bind(patch.fields.to_string())
                    .bind(patch.collection.as_str())
                    .bind(patch.id.0.as_str())
                    .bind(path);
                    match &guard.expected {
                        Value::String(expected) => query.bind(expected.clone()),
                        Value::Bool(expected) => query.bind(*expected as i64),
                        Value::Number(expected) if expected.is_i64() => {
                            query.bind(expected.as_i64())
                        }
                        other => query.bind(other.to_string()),
                    }
                    .execute(&mut **conn)
                    .await?
                }
                None => {
                    sqlx::query(
                        "UPDATE documents SET body = json_patch(body, ?)
                         WHERE collection = ? AND id = ?",
                    )
                    .bind(patch.fields.to_string())
                    .bind(patch.collection.as_str())
                    .bind(patch.id.0.as_str())
                    .execute(&mut **conn)
                    .await?
                }
            };

            if result.rows_affected() == 0 {
                let (field, expected) = match &patch.guard {
                    Some(guard) => (guard.field.clone(), guard.expected.to_string()),
                    None => (String::new(), String::new()),
                };
                return Err(StoreError::PreconditionFailed {
                    collection: patch.collection.to_string(),
                    id: patch.id.0.clone(),
                    field,
                    expected,
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        body: Value,
    ) -> Result<DocumentId, StoreError> {
        let mut body = body;
        let object = body.as_object_mut().ok_or(StoreError::NonObjectBody)?;
        let id = Uuid::new_v4().to_string();
        object.insert("id".to_string(), Value::String(id.clone()));

        sqlx::query("INSERT INTO documents (collection, id, body, created_at) VALUES (?, ?, ?, ?)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(body.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        self.publish(collection).await?;
        Ok(DocumentId(id))
    }

    async fn atomic_batch(&self, patches: Vec<DocumentPatch>) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;

        // IMMEDIATE takes the write lock up front, so a racing batch waits
        // for this one to commit and then sees its guard fail cleanly
        // instead of dying on a stale snapshot at upgrade time.
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        match Self::apply_patches(&mut conn, &patches).await {
            Ok(()) => {
                if let Err(error) = sqlx::query("COMMIT").execute(&mut *conn).await {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                    return Err(error.into());
                }
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(error);
            }
        }
        drop(conn);

        let mut published: Vec<&CollectionPath> = Vec::new();
        for patch in &patches {
            if published.contains(&&patch.collection) {
                continue;
            }
            published.push(&patch.collection);
            self.publish(&patch.collection).await?;
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        filter: Option<Filter>,
    ) -> Result<Subscription, StoreError> {
        let documents = self.snapshot(collection).await?;
        Ok(self.feed.register(collection.clone(), filter, &documents))
    }
}
