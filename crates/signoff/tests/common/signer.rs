//! Signer whose behaviour is scripted per document.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use signoff::{Signer, SignerError};

#[derive(Default)]
pub struct ScriptedSigner {
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes signing `document_id` fail with `SignerError::Unavailable`.
    pub fn fail_on(&self, document_id: &str) {
        self.failing.lock().unwrap().insert(document_id.to_string());
    }

    pub fn heal(&self, document_id: &str) {
        self.failing.lock().unwrap().remove(document_id);
    }

    /// Makes signing `document_id` never return.
    pub fn hang_on(&self, document_id: &str) {
        self.hanging.lock().unwrap().insert(document_id.to_string());
    }

    /// Makes signing `document_id` panic.
    pub fn panic_on(&self, document_id: &str) {
        self.panicking.lock().unwrap().insert(document_id.to_string());
    }

    /// While gated, every call waits for `release()` after announcing itself.
    pub fn set_gated(&self, gated: bool) {
        self.gated.store(gated, Ordering::SeqCst);
    }

    /// Resolves once a gated call is in flight.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Signer for ScriptedSigner {
    async fn sign(&self, document_id: &str, _signature_ref: &str) -> Result<(), SignerError> {
        self.calls.lock().unwrap().push(document_id.to_string());

        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let hangs = self.hanging.lock().unwrap().contains(document_id);
        if hangs {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let panics = self.panicking.lock().unwrap().contains(document_id);
        if panics {
            panic!("scripted panic for {}", document_id);
        }

        let fails = self.failing.lock().unwrap().contains(document_id);
        if fails {
            return Err(SignerError::Unavailable(format!(
                "scripted failure for {}",
                document_id
            )));
        }
        Ok(())
    }
}
