//! Wire events published to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::event::SubjectKind;
use crate::status::RequestStatus;

/// Topic carrying `StatusChanged` events.
pub const STATUS_TOPIC: &str = "request-status";
/// Topic carrying `SigningProgress` events.
pub const PROGRESS_TOPIC: &str = "signing-progress";

/// A request or document changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanged {
    pub subject_id: String,
    pub subject_kind: SubjectKind,
    pub old_status: RequestStatus,
    pub new_status: RequestStatus,
    /// Always serialized, `null` unless the change was a rejection.
    pub reason: Option<String>,
}

impl StatusChanged {
    pub fn request(
        request_id: &str,
        old_status: RequestStatus,
        new_status: RequestStatus,
        reason: Option<&str>,
    ) -> Self {
        Self {
            subject_id: request_id.to_string(),
            subject_kind: SubjectKind::Request,
            old_status,
            new_status,
            reason: reason.map(str::to_string),
        }
    }

    pub fn document(
        document_id: &str,
        old_status: RequestStatus,
        new_status: RequestStatus,
        reason: Option<&str>,
    ) -> Self {
        Self {
            subject_id: document_id.to_string(),
            subject_kind: SubjectKind::Document,
            old_status,
            new_status,
            reason: reason.map(str::to_string),
        }
    }
}

/// One more document of a batch has been signed. Observers must tolerate
/// duplicates for the same `(request_id, current)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningProgress {
    pub request_id: String,
    pub current: u32,
    pub total: u32,
}

/// Any event the engine publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    StatusChanged(StatusChanged),
    SigningProgress(SigningProgress),
}

impl EngineEvent {
    /// Topic this event is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            EngineEvent::StatusChanged(_) => STATUS_TOPIC,
            EngineEvent::SigningProgress(_) => PROGRESS_TOPIC,
        }
    }

    /// Request this event belongs to, when it is known from the event alone.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            EngineEvent::StatusChanged(e) if e.subject_kind == SubjectKind::Request => {
                Some(&e.subject_id)
            }
            EngineEvent::StatusChanged(_) => None,
            EngineEvent::SigningProgress(e) => Some(&e.request_id),
        }
    }
}

impl From<StatusChanged> for EngineEvent {
    fn from(event: StatusChanged) -> Self {
        EngineEvent::StatusChanged(event)
    }
}

impl From<SigningProgress> for EngineEvent {
    fn from(event: SigningProgress) -> Self {
        EngineEvent::SigningProgress(event)
    }
}

/// An event as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub topic: String,
    pub event: EngineEvent,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(topic: &str, event: EngineEvent) -> Self {
        Self {
            topic: topic.to_string(),
            event,
            timestamp: Utc::now(),
        }
    }
}
