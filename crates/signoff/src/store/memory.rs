//! In-memory request store.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::model::{Document, Request, RequestRecord};
use crate::store::RequestStore;

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, RequestRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestStore for MemoryStore {
    fn load_request(&self, id: &str) -> Result<RequestRecord, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::request_not_found(id))
    }

    fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        StoreError::check_persistable(&request.id, request.status)?;
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        if records.contains_key(&request.id) {
            return Err(StoreError::AlreadyExists {
                kind: "request",
                id: request.id.clone(),
            });
        }
        records.insert(
            request.id.clone(),
            RequestRecord::new(request.clone(), Vec::new()),
        );
        Ok(())
    }

    fn save_request(&self, request: &Request) -> Result<(), StoreError> {
        StoreError::check_persistable(&request.id, request.status)?;
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(&request.id)
            .ok_or_else(|| StoreError::request_not_found(&request.id))?;
        record.request = request.clone();
        Ok(())
    }

    fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        StoreError::check_persistable(&document.id, document.sign_status)?;
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(&document.request_id)
            .ok_or_else(|| StoreError::request_not_found(&document.request_id))?;
        let slot = record
            .documents
            .iter_mut()
            .find(|d| d.id == document.id)
            .ok_or_else(|| StoreError::document_not_found(&document.id))?;
        *slot = document.clone();
        Ok(())
    }

    fn delete_request(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::request_not_found(id))
    }

    fn delete_document(&self, request_id: &str, document_id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(request_id)
            .ok_or_else(|| StoreError::request_not_found(request_id))?;
        let before = record.documents.len();
        record.documents.retain(|d| d.id != document_id);
        if record.documents.len() == before {
            return Err(StoreError::document_not_found(document_id));
        }
        Ok(())
    }

    fn append_documents(
        &self,
        request_id: &str,
        documents: &[Document],
    ) -> Result<(), StoreError> {
        for doc in documents {
            StoreError::check_persistable(&doc.id, doc.sign_status)?;
        }
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let record = records
            .get_mut(request_id)
            .ok_or_else(|| StoreError::request_not_found(request_id))?;
        if let Some(dup) = documents
            .iter()
            .find(|d| record.documents.iter().any(|existing| existing.id == d.id))
        {
            return Err(StoreError::AlreadyExists {
                kind: "document",
                id: dup.id.clone(),
            });
        }
        record.documents.extend(documents.iter().cloned());
        Ok(())
    }
}
