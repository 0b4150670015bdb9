//! Test harness for isolated lifecycle tests.
//!
//! The `TestHarness` wires a `RequestService` to an in-memory store that can
//! be told to fail, a scripted signer, and a broadcaster tests can subscribe
//! to. Actors:
//! - `owner`: the reader who creates requests
//! - `officer`: the officer requests are sent to

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use signoff::broadcast::Notification;
use signoff::model::RequestRecord;
use signoff::{
    Actor, Document, EngineEvent, MemoryStore, NotificationBroadcaster, Request,
    RequestService, RequestStore, StoreError,
};

use super::builders::uploads;
use super::signer::ScriptedSigner;

/// Memory store whose document saves start failing after a set count.
pub struct FlakyStore {
    inner: MemoryStore,
    document_saves: AtomicUsize,
    fail_after: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            document_saves: AtomicUsize::new(0),
            fail_after: AtomicUsize::new(usize::MAX),
        }
    }

    /// Lets `n` more document saves succeed, then fails the rest.
    pub fn fail_document_saves_after(&self, n: usize) {
        let done = self.document_saves.load(Ordering::SeqCst);
        self.fail_after.store(done + n, Ordering::SeqCst);
    }
}

impl RequestStore for FlakyStore {
    fn load_request(&self, id: &str) -> Result<RequestRecord, StoreError> {
        self.inner.load_request(id)
    }

    fn insert_request(&self, request: &Request) -> Result<(), StoreError> {
        self.inner.insert_request(request)
    }

    fn save_request(&self, request: &Request) -> Result<(), StoreError> {
        self.inner.save_request(request)
    }

    fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        let n = self.document_saves.fetch_add(1, Ordering::SeqCst);
        if n >= self.fail_after.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt {
                id: document.id.clone(),
                reason: "scripted write failure".to_string(),
            });
        }
        self.inner.save_document(document)
    }

    fn delete_request(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_request(id)
    }

    fn delete_document(&self, request_id: &str, document_id: &str) -> Result<(), StoreError> {
        self.inner.delete_document(request_id, document_id)
    }

    fn append_documents(&self, request_id: &str, documents: &[Document]) -> Result<(), StoreError> {
        self.inner.append_documents(request_id, documents)
    }
}

pub struct TestHarness {
    pub service: RequestService,
    pub store: Arc<FlakyStore>,
    pub signer: Arc<ScriptedSigner>,
    pub broadcaster: NotificationBroadcaster,
    pub owner: Actor,
    pub officer: Actor,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    /// Harness whose signer calls time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let store = Arc::new(FlakyStore::new());
        let signer = Arc::new(ScriptedSigner::new());
        let broadcaster = NotificationBroadcaster::new(256);

        let service = RequestService::with_sign_timeout(
            timeout,
            store.clone(),
            signer.clone(),
            Arc::new(broadcaster.clone()),
        );

        Self {
            service,
            store,
            signer,
            broadcaster,
            owner: Actor::reader("owner-1"),
            officer: Actor::officer("officer-9"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.broadcaster.subscribe()
    }

    /// Creates an `Unsigned` request owned by `owner` with `n` documents.
    pub async fn request_with_documents(&self, n: usize) -> (Request, Vec<Document>) {
        let request = self
            .service
            .create_request("Vehicle permits", "Quarterly batch", vec![], &self.owner)
            .expect("create request");
        let docs = self
            .service
            .upload_documents(&request.id, uploads(n), &self.owner)
            .await
            .expect("upload documents");
        (request, docs)
    }

    /// Creates a request with `n` documents and sends it to `officer`.
    pub async fn ready_request(&self, n: usize) -> (String, Vec<Document>) {
        let (request, docs) = self.request_with_documents(n).await;
        self.service
            .send(&request.id, &self.officer.user_id, &self.owner)
            .await
            .expect("send request");
        (request.id, docs)
    }

    pub fn record(&self, request_id: &str) -> RequestRecord {
        self.store.load_request(request_id).expect("load request")
    }
}

/// Collects every notification currently buffered on `rx`.
pub fn drain_events(rx: &mut broadcast::Receiver<Notification>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        events.push(notification.event);
    }
    events
}
