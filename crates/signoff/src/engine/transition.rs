use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::broadcast::events::{StatusChanged, STATUS_TOPIC};
use crate::broadcast::notifier::NotificationChannel;
use crate::engine::event::{SubjectRef, Transition, TransitionEvent};
use crate::engine::locks::RequestLocks;
use crate::engine::table::{self, ActorRequirement, Target};
use crate::error::TransitionError;
use crate::model::{
    signing_order, Actor, Document, DocumentUpload, Request, RequestRecord, TemplateVariable,
};
use crate::status::RequestStatus;
use crate::store::RequestStore;

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The request's status changed.
    Request(Request),
    /// A single document's status changed.
    Document(Document),
    /// A new request was created from the subject.
    Cloned(Request),
    Removed { subject_id: String },
}

impl TransitionOutcome {
    /// The request this outcome carries, if any.
    pub fn into_request(self) -> Option<Request> {
        match self {
            TransitionOutcome::Request(request) | TransitionOutcome::Cloned(request) => {
                Some(request)
            }
            TransitionOutcome::Document(_) | TransitionOutcome::Removed { .. } => None,
        }
    }

    pub fn into_document(self) -> Option<Document> {
        match self {
            TransitionOutcome::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, TransitionOutcome::Removed { .. })
    }
}

/// State handed to the batch coordinator once a request enters `InProcess`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SigningStart {
    pub request: Request,
    /// Status to revert to if the batch does not fully succeed.
    pub previous: RequestStatus,
    /// Signable documents in signing order.
    pub documents: Vec<Document>,
}

/// Validates and applies transitions.
///
/// Every mutation happens under the request's lock: load, validate against
/// the transition table, persist, then publish exactly one `StatusChanged`.
/// Nothing is published when validation or persistence fails.
pub struct TransitionEngine {
    store: Arc<dyn RequestStore>,
    notifier: Arc<dyn NotificationChannel>,
    locks: RequestLocks,
}

impl TransitionEngine {
    pub fn new(store: Arc<dyn RequestStore>, notifier: Arc<dyn NotificationChannel>) -> Self {
        Self {
            store,
            notifier,
            locks: RequestLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RequestStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<dyn NotificationChannel> {
        &self.notifier
    }

    /// Loads a request and its documents without taking the lock.
    pub fn load(&self, request_id: &str) -> Result<RequestRecord, TransitionError> {
        Ok(self.store.load_request(request_id)?)
    }

    pub async fn apply_transition(
        &self,
        subject: &SubjectRef,
        transition: Transition,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let span = info_span!(
            "transition",
            request_id = %subject.request_id(),
            subject = %subject.kind(),
            event = %transition.event(),
            actor = %actor.user_id,
        );

        async {
            let result = match subject {
                SubjectRef::Request { request_id } => {
                    self.apply_to_request(request_id, &transition, actor).await
                }
                SubjectRef::Document {
                    request_id,
                    document_id,
                } => {
                    self.apply_to_document(request_id, document_id, &transition, actor)
                        .await
                }
            };
            match result {
                Err(ref e @ TransitionError::UnknownStatus(_)) => {
                    error!(kind = e.kind(), "Corrupted status data: {}", e);
                }
                Err(ref e) if e.is_user_recoverable() => {
                    debug!(kind = e.kind(), "Transition refused: {}", e);
                }
                Err(ref e) => warn!(kind = e.kind(), "Transition failed: {}", e),
                Ok(_) => {}
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn apply_to_request(
        &self,
        request_id: &str,
        transition: &Transition,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let _guard = self.locks.acquire(request_id).await;
        let RequestRecord { request, documents } = self.store.load_request(request_id)?;

        match table::plan_request(&request, &documents, transition, actor)? {
            Target::Status(next) => {
                let old = request.status;
                let mut updated = request;
                updated.set_status(next, transition.reason().map(str::to_string));
                if let Transition::Send { officer_id } = transition {
                    updated.assigned_officer = Some(officer_id.trim().to_string());
                }

                self.store.save_request(&updated)?;
                self.publish_status(StatusChanged::request(
                    &updated.id,
                    old,
                    next,
                    updated.rejection_reason.as_deref(),
                ));
                info!("Request {} moved {} -> {}", updated.id, old, next);
                Ok(TransitionOutcome::Request(updated))
            }
            Target::Removed => {
                self.store.delete_request(request_id)?;
                info!("Request {} deleted", request_id);
                Ok(TransitionOutcome::Removed {
                    subject_id: request_id.to_string(),
                })
            }
            // Only the batch coordinator may move a request into InProcess.
            Target::Batch => Err(TransitionError::BatchRequired),
            Target::NewRequest => {
                let copy = request.duplicate_for(actor);
                self.store.insert_request(&copy)?;
                info!("Request {} cloned as {}", request_id, copy.id);
                Ok(TransitionOutcome::Cloned(copy))
            }
        }
    }

    async fn apply_to_document(
        &self,
        request_id: &str,
        document_id: &str,
        transition: &Transition,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        let _guard = self.locks.acquire(request_id).await;
        let record = self.store.load_request(request_id)?;
        let mut document = record
            .document(document_id)
            .cloned()
            .ok_or_else(|| TransitionError::NotFound {
                kind: "document",
                id: document_id.to_string(),
            })?;

        match table::plan_document(&record.request, &document, transition, actor)? {
            Target::Status(next) => {
                let old = document.sign_status;
                match (next, transition.reason()) {
                    (RequestStatus::Rejected, Some(reason)) => document.mark_rejected(reason),
                    _ => document.sign_status = next,
                }

                self.store.save_document(&document)?;
                self.publish_status(StatusChanged::document(
                    &document.id,
                    old,
                    next,
                    document.rejection_reason.as_deref(),
                ));
                info!("Document {} moved {} -> {}", document.id, old, next);
                Ok(TransitionOutcome::Document(document))
            }
            Target::Removed => {
                self.store.delete_document(request_id, document_id)?;
                info!("Document {} removed from request {}", document_id, request_id);
                Ok(TransitionOutcome::Removed {
                    subject_id: document_id.to_string(),
                })
            }
            Target::Batch | Target::NewRequest => Err(TransitionError::InvalidTransition {
                current: document.sign_status,
                event: transition.event(),
            }),
        }
    }

    fn mark_in_process(
        &self,
        request: Request,
        documents: Vec<Document>,
    ) -> Result<SigningStart, TransitionError> {
        let previous = request.status;
        let mut updated = request;
        updated.enter_signing();

        self.store.save_request(&updated)?;
        self.publish_status(StatusChanged::request(
            &updated.id,
            previous,
            RequestStatus::InProcess,
            None,
        ));

        let mut targets: Vec<Document> =
            documents.into_iter().filter(Document::is_signable).collect();
        signing_order(&mut targets);
        info!(
            "Request {} entered signing with {} document(s)",
            updated.id,
            targets.len()
        );

        Ok(SigningStart {
            request: updated,
            previous,
            documents: targets,
        })
    }

    /// Validates a request-level Sign and moves the request to `InProcess`.
    pub(crate) async fn start_signing(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<SigningStart, TransitionError> {
        let span = info_span!(
            "transition",
            request_id = %request_id,
            subject = "request",
            event = %TransitionEvent::Sign,
            actor = %actor.user_id,
        );

        async {
            let _guard = self.locks.acquire(request_id).await;
            let RequestRecord { request, documents } = self.store.load_request(request_id)?;
            match table::plan_request(&request, &documents, &Transition::Sign, actor)? {
                Target::Batch => self.mark_in_process(request, documents),
                _ => Err(TransitionError::InvalidTransition {
                    current: request.status,
                    event: TransitionEvent::Sign,
                }),
            }
        }
        .instrument(span)
        .await
    }

    /// Records a successful signature on one document of a running batch.
    pub(crate) async fn complete_document_signing(
        &self,
        request_id: &str,
        document_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Document, TransitionError> {
        let _guard = self.locks.acquire(request_id).await;
        let record = self.store.load_request(request_id)?;
        if record.request.status != RequestStatus::InProcess {
            return Err(TransitionError::InvalidTransition {
                current: record.request.status,
                event: TransitionEvent::Sign,
            });
        }

        let mut document = record
            .document(document_id)
            .cloned()
            .ok_or_else(|| TransitionError::NotFound {
                kind: "document",
                id: document_id.to_string(),
            })?;
        if !document.is_signable() {
            return Err(TransitionError::InvalidTransition {
                current: document.sign_status,
                event: TransitionEvent::Sign,
            });
        }

        let old = document.sign_status;
        document.mark_signed(at);
        self.store.save_document(&document)?;
        self.publish_status(StatusChanged::document(
            &document.id,
            old,
            RequestStatus::Signed,
            None,
        ));
        Ok(document)
    }

    /// Moves a request out of `InProcess` at the end of a batch.
    pub(crate) async fn finish_signing(
        &self,
        request_id: &str,
        status: RequestStatus,
    ) -> Result<Request, TransitionError> {
        let _guard = self.locks.acquire(request_id).await;
        let mut request = self.store.load_request(request_id)?.request;
        if request.status != RequestStatus::InProcess {
            return Err(TransitionError::InvalidTransition {
                current: request.status,
                event: TransitionEvent::Sign,
            });
        }

        request.set_status(status, None);
        self.store.save_request(&request)?;
        self.publish_status(StatusChanged::request(
            &request.id,
            RequestStatus::InProcess,
            status,
            None,
        ));
        Ok(request)
    }

    /// Creates an `Unsigned` request with no documents.
    pub fn create_request(
        &self,
        title: &str,
        description: &str,
        template_variables: Vec<TemplateVariable>,
        actor: &Actor,
    ) -> Result<Request, TransitionError> {
        let request = Request::new(title, description, &actor.user_id, template_variables);
        self.store.insert_request(&request)?;
        info!("Request {} created by {}", request.id, actor.user_id);
        Ok(request)
    }

    /// Appends documents to an `Unsigned` request owned by `actor`.
    ///
    /// Every upload is validated against the request's required template
    /// variables before anything is written.
    pub async fn append_documents(
        &self,
        request_id: &str,
        uploads: Vec<DocumentUpload>,
        actor: &Actor,
    ) -> Result<Vec<Document>, TransitionError> {
        let _guard = self.locks.acquire(request_id).await;
        let request = self.store.load_request(request_id)?.request;

        if !request.is_owned_by(actor) {
            return Err(TransitionError::Forbidden {
                role: actor.role,
                required: ActorRequirement::Owner,
            });
        }
        if request.status != RequestStatus::Unsigned {
            return Err(TransitionError::MembershipFrozen {
                status: request.status,
            });
        }
        for upload in &uploads {
            if let Some(field) = upload.missing_required(&request.template_variables) {
                return Err(TransitionError::MissingField {
                    document: upload.name.clone(),
                    field: field.to_string(),
                });
            }
        }

        // Offsets keep the upload order when timestamps collide.
        let base = Utc::now();
        let documents: Vec<Document> = uploads
            .into_iter()
            .enumerate()
            .map(|(i, upload)| {
                let mut doc = Document::from_upload(request_id, upload);
                doc.uploaded_at = base + Duration::microseconds(i as i64);
                doc
            })
            .collect();

        self.store.append_documents(request_id, &documents)?;
        info!(
            "Appended {} document(s) to request {}",
            documents.len(),
            request_id
        );
        Ok(documents)
    }

    fn publish_status(&self, event: StatusChanged) {
        self.notifier.publish(STATUS_TOPIC, event.into());
    }
}
