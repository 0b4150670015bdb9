//! SQLite-backed request store.
//!
//! Maps between the domain model and the raw rows of `crate::db`. Timestamps
//! are stored as fixed-width RFC 3339 strings so text order matches time order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::db::document_repo::{self, DocumentRow};
use crate::db::request_repo::{self, RequestRow};
use crate::db::Database;
use crate::error::StoreError;
use crate::model::{Document, Request, RequestRecord};
use crate::status::RequestStatus;
use crate::store::RequestStore;

#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            reason: format!("invalid timestamp '{}': {}", raw, e),
        })
}

fn request_to_row(request: &Request) -> Result<RequestRow, StoreError> {
    StoreError::check_persistable(&request.id, request.status)?;
    Ok(RequestRow {
        id: request.id.clone(),
        title: request.title.clone(),
        description: request.description.clone(),
        created_by: request.created_by.clone(),
        created_at: format_time(&request.created_at),
        status: i64::from(request.status.code()),
        rejection_reason: request.rejection_reason.clone(),
        assigned_officer: request.assigned_officer.clone(),
        pre_batch_status: request.pre_batch_status.map(|s| i64::from(s.code())),
        template_variables: serde_json::to_string(&request.template_variables)?,
    })
}

fn request_from_row(row: RequestRow) -> Result<Request, StoreError> {
    let status = RequestStatus::from_code(row.status)?;
    let pre_batch_status = row
        .pre_batch_status
        .map(RequestStatus::from_code)
        .transpose()?;
    let created_at = parse_time(&row.id, &row.created_at)?;
    let template_variables =
        serde_json::from_str(&row.template_variables).map_err(|e| StoreError::Corrupt {
            id: row.id.clone(),
            reason: format!("invalid template variables: {}", e),
        })?;
    Ok(Request {
        id: row.id,
        title: row.title,
        description: row.description,
        created_by: row.created_by,
        created_at,
        status,
        rejection_reason: row.rejection_reason,
        assigned_officer: row.assigned_officer,
        pre_batch_status,
        template_variables,
    })
}

fn document_to_row(doc: &Document) -> Result<DocumentRow, StoreError> {
    StoreError::check_persistable(&doc.id, doc.sign_status)?;
    Ok(DocumentRow {
        id: doc.id.clone(),
        request_id: doc.request_id.clone(),
        name: doc.name.clone(),
        sign_status: i64::from(doc.sign_status.code()),
        uploaded_at: format_time(&doc.uploaded_at),
        signed_date: doc.signed_date.as_ref().map(format_time),
        rejection_reason: doc.rejection_reason.clone(),
        data: serde_json::to_string(&doc.data)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<Document, StoreError> {
    let sign_status = RequestStatus::from_code(row.sign_status)?;
    let uploaded_at = parse_time(&row.id, &row.uploaded_at)?;
    let signed_date = row
        .signed_date
        .as_deref()
        .map(|raw| parse_time(&row.id, raw))
        .transpose()?;
    let data = serde_json::from_str(&row.data).map_err(|e| StoreError::Corrupt {
        id: row.id.clone(),
        reason: format!("invalid document data: {}", e),
    })?;
    Ok(Document {
        id: row.id,
        request_id: row.request_id,
        name: row.name,
        sign_status,
        uploaded_at,
        signed_date,
        rejection_reason: row.rejection_reason,
        data,
    })
}

impl RequestStore for SqliteStore {
    fn load_request(&self, id: &str) -> Result<RequestRecord, StoreError> {
        let row = request_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| StoreError::request_not_found(id))?;
        let request = request_from_row(row)?;
        let documents = document_repo::list_for_request(&self.db, id)?
            .into_iter()
            .map(document_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RequestRecord::new(request, documents))
    }

    fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        if request_repo::find_by_id(&self.db, &request.id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                kind: "request",
                id: request.id.clone(),
            });
        }
        request_repo::insert(&self.db, &request_to_row(request)?)?;
        Ok(())
    }

    fn save_request(&self, request: &Request) -> Result<(), StoreError> {
        match request_repo::update(&self.db, &request_to_row(request)?)? {
            0 => Err(StoreError::request_not_found(&request.id)),
            _ => Ok(()),
        }
    }

    fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        match document_repo::update(&self.db, &document_to_row(document)?)? {
            0 => Err(StoreError::document_not_found(&document.id)),
            _ => Ok(()),
        }
    }

    fn delete_request(&self, id: &str) -> Result<(), StoreError> {
        match request_repo::delete(&self.db, id)? {
            0 => Err(StoreError::request_not_found(id)),
            _ => Ok(()),
        }
    }

    fn delete_document(&self, request_id: &str, document_id: &str) -> Result<(), StoreError> {
        if request_repo::find_by_id(&self.db, request_id)?.is_none() {
            return Err(StoreError::request_not_found(request_id));
        }
        match document_repo::delete(&self.db, request_id, document_id)? {
            0 => Err(StoreError::document_not_found(document_id)),
            _ => Ok(()),
        }
    }

    fn append_documents(
        &self,
        request_id: &str,
        documents: &[Document],
    ) -> Result<(), StoreError> {
        if request_repo::find_by_id(&self.db, request_id)?.is_none() {
            return Err(StoreError::request_not_found(request_id));
        }
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        if let Some(id) = document_repo::find_existing_id(&self.db, &ids)? {
            return Err(StoreError::AlreadyExists {
                kind: "document",
                id,
            });
        }
        let rows = documents
            .iter()
            .map(document_to_row)
            .collect::<Result<Vec<_>, _>>()?;
        document_repo::insert_many(&self.db, &rows)?;
        Ok(())
    }
}
