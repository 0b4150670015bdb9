//! Caller-facing facade over the engine, the batch coordinator and the
//! aggregate view.

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::RequestAggregateView;
use crate::batch::{BatchHandle, BatchProgress, BatchSigningCoordinator, Signer};
use crate::broadcast::{NotificationBroadcaster, NotificationChannel};
use crate::config::EngineConfig;
use crate::db::Database;
use crate::engine::{SubjectRef, Transition, TransitionEngine, TransitionEvent, TransitionOutcome};
use crate::error::{ConfigError, SignoffError, TransitionError};
use crate::model::{Actor, Document, DocumentUpload, Request, TemplateVariable};
use crate::store::{RequestStore, SqliteStore};

pub struct RequestService {
    engine: Arc<TransitionEngine>,
    coordinator: BatchSigningCoordinator,
}

impl RequestService {
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn RequestStore>,
        signer: Arc<dyn Signer>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self::with_sign_timeout(config.sign_timeout(), store, signer, notifier)
    }

    pub fn with_sign_timeout(
        sign_timeout: Duration,
        store: Arc<dyn RequestStore>,
        signer: Arc<dyn Signer>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        let engine = Arc::new(TransitionEngine::new(store, notifier));
        let coordinator = BatchSigningCoordinator::new(Arc::clone(&engine), signer, sign_timeout);
        Self {
            engine,
            coordinator,
        }
    }

    /// Opens the configured SQLite database and wires an in-process
    /// broadcaster sized by `broadcast_capacity`. The broadcaster is
    /// returned so callers can subscribe.
    pub fn open(
        config: &EngineConfig,
        signer: Arc<dyn Signer>,
    ) -> Result<(Self, NotificationBroadcaster), SignoffError> {
        let path = config
            .resolved_database_path()
            .ok_or_else(|| ConfigError::Validation {
                message: "database_path is not set and no home directory was found".to_string(),
            })?;
        let db = Database::open(&path)?;
        let broadcaster = NotificationBroadcaster::new(config.broadcast_capacity);

        let service = Self::new(
            config,
            Arc::new(SqliteStore::new(db)),
            signer,
            Arc::new(broadcaster.clone()),
        );
        Ok((service, broadcaster))
    }

    pub fn engine(&self) -> &Arc<TransitionEngine> {
        &self.engine
    }

    pub fn coordinator(&self) -> &BatchSigningCoordinator {
        &self.coordinator
    }

    pub fn create_request(
        &self,
        title: &str,
        description: &str,
        template_variables: Vec<TemplateVariable>,
        actor: &Actor,
    ) -> Result<Request, TransitionError> {
        self.engine
            .create_request(title, description, template_variables, actor)
    }

    pub async fn upload_documents(
        &self,
        request_id: &str,
        uploads: Vec<DocumentUpload>,
        actor: &Actor,
    ) -> Result<Vec<Document>, TransitionError> {
        self.engine
            .append_documents(request_id, uploads, actor)
            .await
    }

    pub async fn delete_document(
        &self,
        request_id: &str,
        document_id: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.engine
            .apply_transition(
                &SubjectRef::document(request_id, document_id),
                Transition::Delete,
                actor,
            )
            .await
    }

    pub async fn send(
        &self,
        request_id: &str,
        officer_id: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition(request_id, Transition::send_to(officer_id), actor)
            .await
    }

    pub async fn reject(
        &self,
        request_id: &str,
        reason: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition(request_id, Transition::reject(reason), actor)
            .await
    }

    pub async fn delegate(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition(request_id, Transition::Delegate, actor)
            .await
    }

    pub async fn dispatch(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition(request_id, Transition::Dispatch, actor)
            .await
    }

    pub async fn clone_request(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition(request_id, Transition::Clone, actor)
            .await
    }

    pub async fn delete_request(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition(request_id, Transition::Delete, actor)
            .await
    }

    pub async fn reject_document(
        &self,
        request_id: &str,
        document_id: &str,
        reason: &str,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.engine
            .apply_transition(
                &SubjectRef::document(request_id, document_id),
                Transition::reject(reason),
                actor,
            )
            .await
    }

    /// Starts bulk signing of every signable document.
    pub async fn sign(
        &self,
        request_id: &str,
        signature_ref: &str,
        actor: &Actor,
    ) -> Result<BatchHandle, TransitionError> {
        self.coordinator
            .begin_sign(request_id, signature_ref, actor)
            .await
    }

    pub fn view(&self, request_id: &str) -> Result<RequestAggregateView, TransitionError> {
        self.engine.load(request_id).map(RequestAggregateView::from)
    }

    pub fn available_actions(
        &self,
        request_id: &str,
        actor: &Actor,
    ) -> Result<Vec<TransitionEvent>, TransitionError> {
        Ok(self.view(request_id)?.available_actions(actor))
    }

    pub fn progress(&self, request_id: &str) -> Option<BatchProgress> {
        self.coordinator.progress(request_id)
    }

    /// Column names of the data-entry sheet for a request's template.
    pub fn excel_columns(&self, request_id: &str) -> Result<Vec<String>, TransitionError> {
        let record = self.engine.load(request_id)?;
        Ok(record
            .request
            .excel_columns()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    async fn request_transition(
        &self,
        request_id: &str,
        transition: Transition,
        actor: &Actor,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.engine
            .apply_transition(&SubjectRef::request(request_id), transition, actor)
            .await
    }
}
