pub mod actor;
pub mod document;
pub mod request;

pub use actor::{Actor, Role};
pub use document::{signing_order, Document, DocumentUpload};
pub use request::{Request, TemplateVariable};

/// A request together with its documents, as loaded from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub request: Request,
    pub documents: Vec<Document>,
}

impl RequestRecord {
    pub fn new(request: Request, documents: Vec<Document>) -> Self {
        Self { request, documents }
    }

    pub fn document(&self, document_id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == document_id)
    }
}
