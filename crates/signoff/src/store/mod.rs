//! Persistence collaborator.
//!
//! The engine treats every read as possibly stale and performs every write
//! while holding the request lock. Each call must be atomic on its own.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::model::{Document, Request, RequestRecord};

pub trait RequestStore: Send + Sync {
    /// Loads a request and all of its documents.
    fn load_request(&self, id: &str) -> Result<RequestRecord, StoreError>;

    /// Persists a brand new request.
    fn insert_request(&self, request: &Request) -> Result<(), StoreError>;

    /// Overwrites an existing request's mutable fields.
    fn save_request(&self, request: &Request) -> Result<(), StoreError>;

    /// Overwrites an existing document's mutable fields.
    fn save_document(&self, document: &Document) -> Result<(), StoreError>;

    /// Deletes a request together with its documents.
    fn delete_request(&self, id: &str) -> Result<(), StoreError>;

    /// Deletes one document of a request.
    fn delete_document(&self, request_id: &str, document_id: &str) -> Result<(), StoreError>;

    /// Appends documents to a request. All or nothing.
    fn append_documents(&self, request_id: &str, documents: &[Document])
        -> Result<(), StoreError>;
}
