//! Read-only projections of a request and its documents.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{available_actions, TransitionEvent};
use crate::model::{Actor, Document, Request, RequestRecord, Role};
use crate::status::RequestStatus;

/// Derived view over one request. Never mutates; build a new one per read.
#[derive(Debug, Clone)]
pub struct RequestAggregateView {
    request: Request,
    documents: Vec<Document>,
}

/// Row of a request listing as shown to a particular actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: String,
    pub title: String,
    pub document_count: usize,
    pub rejected_count: usize,
    pub created_at: DateTime<Utc>,
    /// Display label of the effective status.
    pub status: String,
    /// Persisted status code.
    pub raw_status: RequestStatus,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// A rejected document together with why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedDocument {
    pub document_id: String,
    pub name: String,
    pub reason: String,
}

impl RequestAggregateView {
    pub fn new(request: Request, documents: Vec<Document>) -> Self {
        Self { request, documents }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| d.sign_status == RequestStatus::Rejected)
            .count()
    }

    /// `Signed` requests read as `ReadyForDispatch` for their owner and for
    /// readers. Everyone else sees the persisted status.
    pub fn effective_status(&self, actor: &Actor) -> RequestStatus {
        let status = self.request.status;
        if status == RequestStatus::Signed
            && (self.request.is_owned_by(actor) || actor.role == Role::Reader)
        {
            RequestStatus::ReadyForDispatch
        } else {
            status
        }
    }

    pub fn status_label(&self, actor: &Actor) -> &'static str {
        self.effective_status(actor).label()
    }

    pub fn rejected_documents(&self) -> Vec<RejectedDocument> {
        self.documents
            .iter()
            .filter(|d| d.sign_status == RequestStatus::Rejected)
            .map(|d| RejectedDocument {
                document_id: d.id.clone(),
                name: d.name.clone(),
                reason: d.rejection_reason.clone().unwrap_or_default(),
            })
            .collect()
    }

    pub fn available_actions(&self, actor: &Actor) -> Vec<TransitionEvent> {
        available_actions(&self.request, &self.documents, actor)
    }

    pub fn summary(&self, actor: &Actor) -> RequestSummary {
        RequestSummary {
            id: self.request.id.clone(),
            title: self.request.title.clone(),
            document_count: self.document_count(),
            rejected_count: self.rejected_count(),
            created_at: self.request.created_at,
            status: self.status_label(actor).to_string(),
            raw_status: self.request.status,
            created_by: self.request.created_by.clone(),
            rejection_reason: self.request.rejection_reason.clone(),
        }
    }
}

impl From<RequestRecord> for RequestAggregateView {
    fn from(record: RequestRecord) -> Self {
        Self::new(record.request, record.documents)
    }
}
