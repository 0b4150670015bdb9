//! The transition table.
//!
//! This is the single authoritative source for which events are allowed per
//! (status, role, ownership). Both validation and `available_actions` read
//! from it.

use std::fmt;

use serde::Serialize;

use crate::engine::event::{Transition, TransitionEvent};
use crate::error::TransitionError;
use crate::model::{Actor, Document, Request, Role};
use crate::status::RequestStatus;

/// Who may trigger a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRequirement {
    ReaderOrAdmin,
    Owner,
    OfficerNotOwner,
    Reader,
    Anyone,
}

impl ActorRequirement {
    pub fn admits(self, actor: &Actor, owner: &str) -> bool {
        let is_owner = actor.user_id == owner;
        match self {
            ActorRequirement::ReaderOrAdmin => matches!(actor.role, Role::Reader | Role::Admin),
            ActorRequirement::Owner => is_owner,
            ActorRequirement::OfficerNotOwner => actor.role == Role::Officer && !is_owner,
            ActorRequirement::Reader => actor.role == Role::Reader,
            ActorRequirement::Anyone => true,
        }
    }
}

impl fmt::Display for ActorRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRequirement::ReaderOrAdmin => write!(f, "a reader or admin"),
            ActorRequirement::Owner => write!(f, "the request owner"),
            ActorRequirement::OfficerNotOwner => write!(f, "an officer other than the owner"),
            ActorRequirement::Reader => write!(f, "a reader"),
            ActorRequirement::Anyone => write!(f, "any authenticated user"),
        }
    }
}

/// What a matching rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Status(RequestStatus),
    /// Subject is deleted.
    Removed,
    /// Request enters `InProcess` and is handed to the batch coordinator.
    Batch,
    /// A new `Unsigned` request is created; the subject is unchanged.
    NewRequest,
}

/// A request-level row. `from: None` matches any status.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub from: Option<RequestStatus>,
    pub event: TransitionEvent,
    pub actor: ActorRequirement,
    pub target: Target,
}

pub const REQUEST_RULES: &[Rule] = &[
    Rule {
        from: Some(RequestStatus::Unsigned),
        event: TransitionEvent::Send,
        actor: ActorRequirement::ReaderOrAdmin,
        target: Target::Status(RequestStatus::ReadyForSign),
    },
    Rule {
        from: Some(RequestStatus::Unsigned),
        event: TransitionEvent::Delete,
        actor: ActorRequirement::Owner,
        target: Target::Removed,
    },
    Rule {
        from: Some(RequestStatus::Delegated),
        event: TransitionEvent::Sign,
        actor: ActorRequirement::Owner,
        target: Target::Batch,
    },
    Rule {
        from: Some(RequestStatus::ReadyForSign),
        event: TransitionEvent::Sign,
        actor: ActorRequirement::OfficerNotOwner,
        target: Target::Batch,
    },
    Rule {
        from: Some(RequestStatus::ReadyForSign),
        event: TransitionEvent::Reject,
        actor: ActorRequirement::OfficerNotOwner,
        target: Target::Status(RequestStatus::Rejected),
    },
    Rule {
        from: Some(RequestStatus::ReadyForSign),
        event: TransitionEvent::Delegate,
        actor: ActorRequirement::OfficerNotOwner,
        target: Target::Status(RequestStatus::Delegated),
    },
    Rule {
        from: Some(RequestStatus::Signed),
        event: TransitionEvent::Dispatch,
        actor: ActorRequirement::Reader,
        target: Target::Status(RequestStatus::Dispatched),
    },
    Rule {
        from: None,
        event: TransitionEvent::Clone,
        actor: ActorRequirement::Anyone,
        target: Target::NewRequest,
    },
];

/// A document-level row. The parent request must be in `parent` so that no
/// document changes underneath a running batch.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRule {
    pub from: &'static [RequestStatus],
    pub parent: RequestStatus,
    pub event: TransitionEvent,
    pub actor: ActorRequirement,
    pub target: Target,
}

pub const DOCUMENT_RULES: &[DocumentRule] = &[
    DocumentRule {
        from: &[RequestStatus::Unsigned, RequestStatus::ReadyForSign],
        parent: RequestStatus::ReadyForSign,
        event: TransitionEvent::Reject,
        actor: ActorRequirement::OfficerNotOwner,
        target: Target::Status(RequestStatus::Rejected),
    },
    DocumentRule {
        from: &[RequestStatus::Unsigned],
        parent: RequestStatus::Unsigned,
        event: TransitionEvent::Delete,
        actor: ActorRequirement::Owner,
        target: Target::Removed,
    },
];

fn find_request_rule(status: RequestStatus, event: TransitionEvent) -> Option<&'static Rule> {
    REQUEST_RULES
        .iter()
        .find(|r| r.event == event && r.from.map_or(true, |s| s == status))
}

fn check_reason(transition: &Transition) -> Result<(), TransitionError> {
    match transition.reason() {
        Some(reason) if reason.is_empty() => Err(TransitionError::MissingReason),
        _ => Ok(()),
    }
}

/// State preconditions beyond the status column.
fn preconditions_hold(event: TransitionEvent, documents: &[Document]) -> bool {
    match event {
        TransitionEvent::Send => !documents.is_empty(),
        TransitionEvent::Sign => documents.iter().any(Document::is_signable),
        _ => true,
    }
}

/// Validates a request-level transition without touching state.
pub fn plan_request(
    request: &Request,
    documents: &[Document],
    transition: &Transition,
    actor: &Actor,
) -> Result<Target, TransitionError> {
    let event = transition.event();
    check_reason(transition)?;

    let rule =
        find_request_rule(request.status, event).ok_or(TransitionError::InvalidTransition {
            current: request.status,
            event,
        })?;

    if !rule.actor.admits(actor, &request.created_by) {
        return Err(TransitionError::Forbidden {
            role: actor.role,
            required: rule.actor,
        });
    }

    if !preconditions_hold(event, documents) {
        return Err(TransitionError::InvalidTransition {
            current: request.status,
            event,
        });
    }

    if let Transition::Send { officer_id } = transition {
        if officer_id.trim().is_empty() {
            return Err(TransitionError::MissingOfficer);
        }
    }

    Ok(rule.target)
}

/// Validates a document-level transition without touching state.
pub fn plan_document(
    request: &Request,
    document: &Document,
    transition: &Transition,
    actor: &Actor,
) -> Result<Target, TransitionError> {
    let event = transition.event();
    check_reason(transition)?;

    let rule = DOCUMENT_RULES
        .iter()
        .find(|r| r.event == event && r.from.contains(&document.sign_status))
        .ok_or(TransitionError::InvalidTransition {
            current: document.sign_status,
            event,
        })?;

    if request.status != rule.parent {
        return Err(TransitionError::InvalidTransition {
            current: request.status,
            event,
        });
    }

    if !rule.actor.admits(actor, &request.created_by) {
        return Err(TransitionError::Forbidden {
            role: actor.role,
            required: rule.actor,
        });
    }

    Ok(rule.target)
}

/// Events the actor may trigger on this request right now.
pub fn available_actions(
    request: &Request,
    documents: &[Document],
    actor: &Actor,
) -> Vec<TransitionEvent> {
    let mut actions = Vec::new();
    for rule in REQUEST_RULES {
        if rule.from.is_some_and(|s| s != request.status) {
            continue;
        }
        if !rule.actor.admits(actor, &request.created_by) {
            continue;
        }
        if !preconditions_hold(rule.event, documents) {
            continue;
        }
        if !actions.contains(&rule.event) {
            actions.push(rule.event);
        }
    }
    actions
}
