//! Request aggregate root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::actor::Actor;
use crate::status::RequestStatus;

/// Describes one field a document's `data` must or may contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariable {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Whether the field is a column of the data-entry sheet.
    #[serde(default)]
    pub show_on_excel: bool,
}

impl TemplateVariable {
    pub fn new(name: impl Into<String>, required: bool, show_on_excel: bool) -> Self {
        Self {
            name: name.into(),
            required,
            show_on_excel,
        }
    }
}

/// A templated document package submitted for approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Owner identity.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub status: RequestStatus,
    /// Present only while `status` is `Rejected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Officer selected when the request was sent for signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_officer: Option<String>,
    /// Status the request held before its running signing batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_batch_status: Option<RequestStatus>,
    #[serde(default)]
    pub template_variables: Vec<TemplateVariable>,
}

impl Request {
    /// Creates a new `Unsigned` request owned by `created_by`.
    pub fn new(
        title: &str,
        description: &str,
        created_by: &str,
        template_variables: Vec<TemplateVariable>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            status: RequestStatus::Unsigned,
            rejection_reason: None,
            assigned_officer: None,
            pre_batch_status: None,
            template_variables,
        }
    }

    /// Returns true if the actor created this request.
    pub fn is_owned_by(&self, actor: &Actor) -> bool {
        self.created_by == actor.user_id
    }

    /// Sets the status, keeping `rejection_reason` present iff `Rejected`.
    pub fn set_status(&mut self, status: RequestStatus, reason: Option<String>) {
        self.status = status;
        self.pre_batch_status = None;
        self.rejection_reason = if status == RequestStatus::Rejected {
            reason
        } else {
            None
        };
    }

    /// Moves to `InProcess`, remembering the status to fall back to.
    pub fn enter_signing(&mut self) {
        self.pre_batch_status = Some(self.status);
        self.status = RequestStatus::InProcess;
        self.rejection_reason = None;
    }

    /// Builds an `Unsigned` copy with the same template and variables, a
    /// fresh identity, and `owner` as creator.
    pub fn duplicate_for(&self, owner: &Actor) -> Self {
        let mut copy = Request::new(
            &self.title,
            &self.description,
            &owner.user_id,
            self.template_variables.clone(),
        );
        copy.title = format!("{} (copy)", self.title);
        copy
    }

    /// Names of template variables shown as data-entry sheet columns, in
    /// template order.
    pub fn excel_columns(&self) -> Vec<&str> {
        self.template_variables
            .iter()
            .filter(|v| v.show_on_excel)
            .map(|v| v.name.as_str())
            .collect()
    }
}
