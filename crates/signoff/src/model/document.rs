//! Documents owned by a request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::request::TemplateVariable;
use crate::status::RequestStatus;

/// A single document inside a request package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub request_id: String,
    pub name: String,
    pub sign_status: RequestStatus,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<DateTime<Utc>>,
    /// Present only while `sign_status` is `Rejected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Template field values. Opaque to the engine.
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Caller-supplied input for a new document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub name: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl DocumentUpload {
    pub fn new(name: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Returns the first required variable that is absent or blank.
    pub fn missing_required<'a>(&self, variables: &'a [TemplateVariable]) -> Option<&'a str> {
        variables
            .iter()
            .filter(|v| v.required)
            .find(|v| is_blank(self.data.get(&v.name)))
            .map(|v| v.name.as_str())
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

impl Document {
    /// Creates an `Unsigned` document for `request_id`.
    pub fn from_upload(request_id: &str, upload: DocumentUpload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            name: upload.name,
            sign_status: RequestStatus::Unsigned,
            uploaded_at: Utc::now(),
            signed_date: None,
            rejection_reason: None,
            data: upload.data,
        }
    }

    /// Whether a bulk sign should target this document.
    pub fn is_signable(&self) -> bool {
        matches!(
            self.sign_status,
            RequestStatus::Unsigned | RequestStatus::ReadyForSign
        )
    }

    pub fn mark_signed(&mut self, at: DateTime<Utc>) {
        self.sign_status = RequestStatus::Signed;
        self.signed_date = Some(at);
        self.rejection_reason = None;
    }

    pub fn mark_rejected(&mut self, reason: &str) {
        self.sign_status = RequestStatus::Rejected;
        self.rejection_reason = Some(reason.to_string());
    }
}

/// Orders documents for signing: ascending upload time, ties broken by id.
pub fn signing_order(documents: &mut [Document]) {
    documents.sort_by(|a, b| {
        a.uploaded_at
            .cmp(&b.uploaded_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
