use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document::{
    merge_fields, CollectionPath, Document, DocumentId, DocumentPatch, DocumentStore, Filter,
    StoreError,
};
use crate::feed::{ChangeFeed, Subscription};

/// In-memory adapter. Collections keep insertion order; a batch validates
/// and applies under one write lock, so readers never observe partial
/// application.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    feed: Arc<ChangeFeed>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        body: Value,
    ) -> Result<DocumentId, StoreError> {
        let mut body = body;
        let object = body.as_object_mut().ok_or(StoreError::NonObjectBody)?;
        let id = Uuid::new_v4().to_string();
        object.insert("id".to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.as_str().to_string()).or_default();
        documents.push(Document { id: DocumentId(id.clone()), body });

        self.feed.publish(collection, documents);
        Ok(DocumentId(id))
    }

    async fn atomic_batch(&self, patches: Vec<DocumentPatch>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;

        // Validate everything before touching anything.
        for patch in &patches {
            if !patch.fields.is_object() {
                return Err(StoreError::NonObjectBody);
            }
            let documents =
                collections.get(patch.collection.as_str()).map(Vec::as_slice).unwrap_or_default();
            let document =
                documents.iter().find(|doc| doc.id == patch.id).ok_or_else(|| {
                    StoreError::MissingDocument {
                        collection: patch.collection.to_string(),
                        id: patch.id.0.clone(),
                    }
                })?;

            if let Some(guard) = &patch.guard {
                if document.body.get(&guard.field) != Some(&guard.expected) {
                    return Err(StoreError::PreconditionFailed {
                        collection: patch.collection.to_string(),
                        id: patch.id.0.clone(),
                        field: guard.field.clone(),
                        expected: guard.expected.to_string(),
                    });
                }
            }
        }

        for patch in &patches {
            let documents = collections
                .get_mut(patch.collection.as_str())
                .and_then(|docs| docs.iter_mut().find(|doc| doc.id == patch.id));
            if let Some(document) = documents {
                merge_fields(&mut document.body, &patch.fields)?;
            }
        }

        let mut published: Vec<&CollectionPath> = Vec::new();
        for patch in &patches {
            if published.contains(&&patch.collection) {
                continue;
            }
            published.push(&patch.collection);
            let documents =
                collections.get(patch.collection.as_str()).map(Vec::as_slice).unwrap_or_default();
            self.feed.publish(&patch.collection, documents);
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        filter: Option<Filter>,
    ) -> Result<Subscription, StoreError> {
        let collections = self.collections.read().await;
        let documents = collections.get(collection.as_str()).map(Vec::as_slice).unwrap_or_default();
        Ok(self.feed.register(collection.clone(), filter, documents))
    }
}
