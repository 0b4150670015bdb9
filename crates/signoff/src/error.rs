use std::path::PathBuf;
use thiserror::Error;

use crate::engine::event::TransitionEvent;
use crate::engine::table::ActorRequirement;
use crate::model::Role;
use crate::status::{RequestStatus, UnknownStatus};

#[derive(Error, Debug)]
pub enum SignoffError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}

/// Why a lifecycle operation was refused or could not complete.
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("Cannot {event} while status is '{current}'")]
    InvalidTransition {
        current: RequestStatus,
        event: TransitionEvent,
    },

    #[error("Role '{role}' is not allowed to do this; requires {required}")]
    Forbidden {
        role: Role,
        required: ActorRequirement,
    },

    #[error("A rejection reason is required")]
    MissingReason,

    #[error("An officer must be selected before sending for signature")]
    MissingOfficer,

    #[error("Documents can only be changed while the request is unsigned (status is '{status}')")]
    MembershipFrozen { status: RequestStatus },

    #[error("Document '{document}' is missing required field '{field}'")]
    MissingField { document: String, field: String },

    /// Request-level Sign runs as a batch and cannot be applied as a
    /// single transition.
    #[error("Signing a request must be started as a signing batch")]
    BatchRequired,

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Status data is corrupted: {0}")]
    UnknownStatus(#[from] UnknownStatus),

    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorFailure),
}

impl TransitionError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TransitionError::InvalidTransition { .. } => "invalid_transition",
            TransitionError::Forbidden { .. } => "forbidden",
            TransitionError::MissingReason => "missing_reason",
            TransitionError::MissingOfficer => "missing_officer",
            TransitionError::MembershipFrozen { .. } => "membership_frozen",
            TransitionError::MissingField { .. } => "missing_field",
            TransitionError::BatchRequired => "batch_required",
            TransitionError::NotFound { .. } => "not_found",
            TransitionError::UnknownStatus(_) => "unknown_status",
            TransitionError::Collaborator(_) => "collaborator_failure",
        }
    }

    /// Whether the user can fix the problem by changing input or retrying.
    /// `UnknownStatus` means corrupted data and is never user-recoverable.
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(
            self,
            TransitionError::UnknownStatus(_) | TransitionError::Collaborator(_)
        )
    }
}

impl From<StoreError> for TransitionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => TransitionError::NotFound { kind, id },
            StoreError::UnknownStatus(e) => TransitionError::UnknownStatus(e),
            other => TransitionError::Collaborator(CollaboratorFailure::Store(other)),
        }
    }
}

/// Failure of an external collaborator.
#[derive(Error, Debug)]
pub enum CollaboratorFailure {
    #[error("persistence failed: {0}")]
    Store(StoreError),

    #[error("batch task aborted: {0}")]
    TaskAborted(String),
}

/// Errors from a persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("Stored status is invalid: {0}")]
    UnknownStatus(#[from] UnknownStatus),

    #[error("Corrupted row '{id}': {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Failed to encode stored JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Status '{status}' of '{id}' is display-only and cannot be stored")]
    NotPersistable { id: String, status: RequestStatus },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn request_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "request",
            id: id.to_string(),
        }
    }

    pub fn document_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "document",
            id: id.to_string(),
        }
    }

    /// Refuses display-only statuses before they reach storage.
    pub fn check_persistable(id: &str, status: RequestStatus) -> std::result::Result<(), Self> {
        if status.is_persistable() {
            Ok(())
        } else {
            Err(StoreError::NotPersistable {
                id: id.to_string(),
                status,
            })
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

pub type Result<T> = std::result::Result<T, SignoffError>;
