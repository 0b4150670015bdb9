//! Lifecycle events and the subjects they apply to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of lifecycle event, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionEvent {
    Send,
    Sign,
    Reject,
    Delegate,
    Dispatch,
    Clone,
    Delete,
}

impl TransitionEvent {
    pub const ALL: [TransitionEvent; 7] = [
        TransitionEvent::Send,
        TransitionEvent::Sign,
        TransitionEvent::Reject,
        TransitionEvent::Delegate,
        TransitionEvent::Dispatch,
        TransitionEvent::Clone,
        TransitionEvent::Delete,
    ];
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionEvent::Send => write!(f, "send"),
            TransitionEvent::Sign => write!(f, "sign"),
            TransitionEvent::Reject => write!(f, "reject"),
            TransitionEvent::Delegate => write!(f, "delegate"),
            TransitionEvent::Dispatch => write!(f, "dispatch"),
            TransitionEvent::Clone => write!(f, "clone"),
            TransitionEvent::Delete => write!(f, "delete"),
        }
    }
}

/// A requested transition with the input it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Send for signature to the selected officer.
    Send { officer_id: String },
    Sign,
    Reject { reason: String },
    Delegate,
    Dispatch,
    Clone,
    Delete,
}

impl Transition {
    pub fn event(&self) -> TransitionEvent {
        match self {
            Transition::Send { .. } => TransitionEvent::Send,
            Transition::Sign => TransitionEvent::Sign,
            Transition::Reject { .. } => TransitionEvent::Reject,
            Transition::Delegate => TransitionEvent::Delegate,
            Transition::Dispatch => TransitionEvent::Dispatch,
            Transition::Clone => TransitionEvent::Clone,
            Transition::Delete => TransitionEvent::Delete,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Transition::Reject {
            reason: reason.into(),
        }
    }

    pub fn send_to(officer_id: impl Into<String>) -> Self {
        Transition::Send {
            officer_id: officer_id.into(),
        }
    }

    /// Trimmed rejection reason, if this is a rejection.
    pub(crate) fn reason(&self) -> Option<&str> {
        match self {
            Transition::Reject { reason } => Some(reason.trim()),
            _ => None,
        }
    }
}

/// Whether an event concerns a whole request or one of its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Request,
    Document,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Request => write!(f, "request"),
            SubjectKind::Document => write!(f, "document"),
        }
    }
}

/// Identifies the subject of a transition. The engine reloads the subject
/// under the request lock, so callers never pass possibly stale state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectRef {
    Request {
        request_id: String,
    },
    Document {
        request_id: String,
        document_id: String,
    },
}

impl SubjectRef {
    pub fn request(request_id: impl Into<String>) -> Self {
        SubjectRef::Request {
            request_id: request_id.into(),
        }
    }

    pub fn document(request_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        SubjectRef::Document {
            request_id: request_id.into(),
            document_id: document_id.into(),
        }
    }

    /// Id of the request whose lock guards this subject.
    pub fn request_id(&self) -> &str {
        match self {
            SubjectRef::Request { request_id } | SubjectRef::Document { request_id, .. } => {
                request_id
            }
        }
    }

    pub fn kind(&self) -> SubjectKind {
        match self {
            SubjectRef::Request { .. } => SubjectKind::Request,
            SubjectRef::Document { .. } => SubjectKind::Document,
        }
    }
}
