pub mod document;
pub mod feed;
pub mod memory;
pub mod migrations;
pub mod sql;

pub use document::{
    CollectionPath, Document, DocumentId, DocumentPatch, DocumentStore, FieldGuard, Filter,
    StoreError,
};
pub use feed::{ChangeFeed, Snapshot, Subscription};
pub use memory::MemoryDocumentStore;
pub use sql::{DbPool, SqlDocumentStore};
