use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use tenderbid_core::errors::ApplicationError;

use crate::feed::Subscription;

/// Fully qualified collection name: `apps/{app_id}/{partition}/{name}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(app_id: &str, partition: &str, name: &str) -> Self {
        Self(format!("apps/{app_id}/{partition}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentId(pub String);

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub body: Value,
}

/// Precondition on a patch: the named top-level field must currently equal
/// the expected value, or the whole batch is rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldGuard {
    pub field: String,
    pub expected: Value,
}

impl FieldGuard {
    pub fn equals(field: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self { field: field.into(), expected: expected.into() }
    }
}

/// Shallow merge-patch against one document. `fields` must be a JSON object;
/// a `null` value removes the key, everything else replaces it.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentPatch {
    pub collection: CollectionPath,
    pub id: DocumentId,
    pub fields: Value,
    pub guard: Option<FieldGuard>,
}

impl DocumentPatch {
    pub fn update(collection: CollectionPath, id: DocumentId, fields: Value) -> Self {
        Self { collection, id, fields, guard: None }
    }

    pub fn guarded(
        collection: CollectionPath,
        id: DocumentId,
        fields: Value,
        guard: FieldGuard,
    ) -> Self {
        Self { collection, id, fields, guard: Some(guard) }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    FieldEquals { field: String, value: Value },
}

impl Filter {
    pub fn field_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEquals { field: field.into(), value: value.into() }
    }

    pub fn matches(&self, body: &Value) -> bool {
        match self {
            Self::FieldEquals { field, value } => body.get(field) == Some(value),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("document `{id}` not found in `{collection}`")]
    MissingDocument { collection: String, id: String },
    #[error("precondition failed for `{id}` in `{collection}`: {field} is no longer {expected}")]
    PreconditionFailed { collection: String, id: String, field: String, expected: String },
    #[error("document bodies and patch fields must be JSON objects")]
    NonObjectBody,
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::PreconditionFailed { .. } => ApplicationError::Conflict(
                "The record changed in another session before this update could be applied."
                    .to_string(),
            ),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// The persistence and realtime-sync collaborator. The store is the sole
/// source of truth; callers hold only read-model copies fed by `subscribe`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Appends a record and assigns its opaque id. The assigned id is also
    /// written into the body under `id` so subscribers can decode it.
    async fn create(&self, collection: &CollectionPath, body: Value)
        -> Result<DocumentId, StoreError>;

    /// Applies every patch or none of them. A failed guard rejects the whole
    /// batch; partial application is never observable to any reader.
    async fn atomic_batch(&self, patches: Vec<DocumentPatch>) -> Result<(), StoreError>;

    /// Push-based change feed. Delivers the current matching record set
    /// immediately, then again after every commit that touches the
    /// collection. The handle unregisters on `close()` or drop.
    async fn subscribe(
        &self,
        collection: &CollectionPath,
        filter: Option<Filter>,
    ) -> Result<Subscription, StoreError>;
}

/// RFC 7386-style shallow merge, matching SQLite's `json_patch` for flat
/// field sets: `null` removes a key, any other value replaces it.
pub(crate) fn merge_fields(body: &mut Value, fields: &Value) -> Result<(), StoreError> {
    let patch = fields.as_object().ok_or(StoreError::NonObjectBody)?;
    let target = body.as_object_mut().ok_or(StoreError::NonObjectBody)?;

    for (key, value) in patch {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tenderbid_core::errors::ApplicationError;

    use super::{merge_fields, CollectionPath, Filter, StoreError};

    #[test]
    fn collection_paths_are_tenant_namespaced() {
        let path = CollectionPath::new("tenderbid-local", "public", "tenders");
        assert_eq!(path.as_str(), "apps/tenderbid-local/public/tenders");
    }

    #[test]
    fn filter_matches_on_field_equality() {
        let filter = Filter::field_equals("tender_id", "t-1");
        assert!(filter.matches(&json!({"tender_id": "t-1", "amount": "10"})));
        assert!(!filter.matches(&json!({"tender_id": "t-2"})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn merge_replaces_and_removes_fields() {
        let mut body = json!({"status": "open", "title": "Roof repair", "award": null});
        merge_fields(&mut body, &json!({"status": "awarded", "title": null})).expect("merge");

        assert_eq!(body.get("status"), Some(&json!("awarded")));
        assert!(body.get("title").is_none());
    }

    #[test]
    fn merge_rejects_non_object_patches() {
        let mut body = json!({"status": "open"});
        let error = merge_fields(&mut body, &json!(["not", "an", "object"]))
            .expect_err("arrays are not patches");
        assert!(matches!(error, StoreError::NonObjectBody));
    }

    #[test]
    fn precondition_failures_convert_to_conflicts() {
        let error = StoreError::PreconditionFailed {
            collection: "apps/t/public/tenders".to_string(),
            id: "t-1".to_string(),
            field: "status".to_string(),
            expected: "open".to_string(),
        };

        assert!(matches!(ApplicationError::from(error), ApplicationError::Conflict(_)));

        let error = StoreError::Decode("bad json".to_string());
        assert!(matches!(ApplicationError::from(error), ApplicationError::Persistence(_)));
    }
}
