//! Bulk signing of every document in a request.
//!
//! A batch runs on its own tokio task. It signs documents one at a time in
//! upload order, records each success through the engine, and publishes a
//! `SigningProgress` after every signed document. The request lock is only
//! held for the individual writes, never across a signer call.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};

use crate::batch::progress::{BatchProgress, ProgressEntry, ProgressTable};
use crate::batch::signer::{Signer, SignerError};
use crate::broadcast::events::{SigningProgress, PROGRESS_TOPIC};
use crate::engine::transition::SigningStart;
use crate::engine::TransitionEngine;
use crate::error::{CollaboratorFailure, TransitionError};
use crate::model::Actor;
use crate::status::RequestStatus;

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every targeted document was signed.
    Completed,
    /// At least one document failed or timed out.
    PartiallyFailed,
    /// Stopped by `BatchHandle::cancel` before all documents were attempted.
    Cancelled,
    /// A write failed; remaining documents were skipped.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDocument {
    pub document_id: String,
    pub error: String,
}

/// Summary returned by `BatchHandle::wait`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub request_id: String,
    pub outcome: BatchOutcome,
    /// Persisted request status after the batch. `InProcess` only if the
    /// final status write itself failed.
    pub final_status: RequestStatus,
    pub total: u32,
    pub signed: Vec<String>,
    pub failed: Vec<FailedDocument>,
    pub skipped: Vec<String>,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcome == BatchOutcome::Completed
    }
}

/// Handle to a running batch.
pub struct BatchHandle {
    request_id: String,
    cancel: Arc<AtomicBool>,
    join: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Asks the batch to stop before its next document. A signer call that
    /// is already running is allowed to finish.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the batch to terminate.
    pub async fn wait(self) -> Result<BatchReport, TransitionError> {
        self.join.await.map_err(|e| {
            TransitionError::Collaborator(CollaboratorFailure::TaskAborted(e.to_string()))
        })
    }
}

pub struct BatchSigningCoordinator {
    engine: Arc<TransitionEngine>,
    signer: Arc<dyn Signer>,
    progress: ProgressTable,
    sign_timeout: Duration,
}

impl BatchSigningCoordinator {
    pub fn new(
        engine: Arc<TransitionEngine>,
        signer: Arc<dyn Signer>,
        sign_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            signer,
            progress: ProgressTable::new(),
            sign_timeout,
        }
    }

    pub fn engine(&self) -> &Arc<TransitionEngine> {
        &self.engine
    }

    /// Snapshot of a running batch, `None` when no batch runs for the request.
    pub fn progress(&self, request_id: &str) -> Option<BatchProgress> {
        self.progress.get(request_id)
    }

    /// Validates the Sign, moves the request to `InProcess` and starts the
    /// batch. Ineligible requests fail here without creating any progress.
    pub async fn begin_sign(
        &self,
        request_id: &str,
        signature_ref: &str,
        actor: &Actor,
    ) -> Result<BatchHandle, TransitionError> {
        let start = self.engine.start_signing(request_id, actor).await?;
        Ok(self.spawn(start, signature_ref))
    }

    fn spawn(&self, start: SigningStart, signature_ref: &str) -> BatchHandle {
        let request_id = start.request.id.clone();
        let total = u32::try_from(start.documents.len()).unwrap_or(u32::MAX);
        let entry = self.progress.start(&request_id, total);
        let cancel = Arc::new(AtomicBool::new(false));

        let run = BatchRun {
            engine: Arc::clone(&self.engine),
            signer: Arc::clone(&self.signer),
            sign_timeout: self.sign_timeout,
            signature_ref: signature_ref.to_string(),
            cancel: Arc::clone(&cancel),
        };
        let span = info_span!("batch_sign", request_id = %request_id, total = total);
        let join = tokio::spawn(run.execute(start, entry).instrument(span));

        BatchHandle {
            request_id,
            cancel,
            join,
        }
    }
}

struct BatchRun {
    engine: Arc<TransitionEngine>,
    signer: Arc<dyn Signer>,
    sign_timeout: Duration,
    signature_ref: String,
    cancel: Arc<AtomicBool>,
}

impl BatchRun {
    async fn execute(self, start: SigningStart, entry: ProgressEntry) -> BatchReport {
        let request_id = start.request.id.clone();
        let total = entry.snapshot().total;
        let mut signed = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = false;
        let mut abort_error: Option<String> = None;

        info!("Batch started for {} document(s)", total);

        let mut documents = start.documents.into_iter();
        while let Some(doc) = documents.next() {
            if self.cancel.load(Ordering::Acquire) {
                info!("Batch cancelled before document {}", doc.id);
                cancelled = true;
                skipped.push(doc.id);
                skipped.extend(documents.by_ref().map(|d| d.id));
                break;
            }

            if let Err(e) = self.sign_one(&doc.id).await {
                warn!(document_id = %doc.id, "Signing failed: {}", e);
                failed.push(FailedDocument {
                    document_id: doc.id,
                    error: e.to_string(),
                });
                continue;
            }

            match self
                .engine
                .complete_document_signing(&request_id, &doc.id, Utc::now())
                .await
            {
                Ok(_) => {
                    let snapshot = entry.advance();
                    self.engine.notifier().publish(
                        PROGRESS_TOPIC,
                        SigningProgress {
                            request_id: request_id.clone(),
                            current: snapshot.current,
                            total: snapshot.total,
                        }
                        .into(),
                    );
                    signed.push(doc.id);
                }
                Err(e) => {
                    error!(
                        document_id = %doc.id,
                        "Failed to record signature, aborting batch: {}", e
                    );
                    abort_error = Some(e.to_string());
                    failed.push(FailedDocument {
                        document_id: doc.id,
                        error: e.to_string(),
                    });
                    skipped.extend(documents.by_ref().map(|d| d.id));
                    break;
                }
            }
        }

        // Progress disappears before the final status is published.
        drop(entry);

        let all_signed = failed.is_empty() && !cancelled && abort_error.is_none();
        let target = if all_signed {
            RequestStatus::Signed
        } else {
            start.previous
        };

        let final_status = match self.engine.finish_signing(&request_id, target).await {
            Ok(request) => request.status,
            Err(e) => {
                error!("Failed to write final status {}: {}", target, e);
                abort_error.get_or_insert_with(|| e.to_string());
                RequestStatus::InProcess
            }
        };

        let outcome = if abort_error.is_some() {
            BatchOutcome::Aborted
        } else if cancelled {
            BatchOutcome::Cancelled
        } else if !failed.is_empty() {
            BatchOutcome::PartiallyFailed
        } else {
            BatchOutcome::Completed
        };

        info!(
            signed = signed.len(),
            failed = failed.len(),
            skipped = skipped.len(),
            "Batch finished: {:?}, request is now {}",
            outcome,
            final_status
        );

        BatchReport {
            request_id,
            outcome,
            final_status,
            total,
            signed,
            failed,
            skipped,
            cancelled,
            error: abort_error,
        }
    }

    /// A panicking signer fails only its own document.
    async fn sign_one(&self, document_id: &str) -> Result<(), SignerError> {
        let call = AssertUnwindSafe(self.signer.sign(document_id, &self.signature_ref));
        match tokio::time::timeout(self.sign_timeout, call.catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(SignerError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(SignerError::TimedOut(self.sign_timeout)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
