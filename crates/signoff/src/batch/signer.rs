//! Signing collaborator interface.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("signer rejected document: {0}")]
    Rejected(String),

    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signing timed out after {0:?}")]
    TimedOut(Duration),

    #[error("signer panicked: {0}")]
    Panicked(String),
}

/// Applies a signature image to a rendered document.
///
/// Implementations must be safe to call concurrently for different
/// documents. A call may be abandoned by the coordinator once the
/// configured timeout elapses.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, document_id: &str, signature_ref: &str) -> Result<(), SignerError>;
}

/// Signer that accepts every document. Useful when signature rendering is
/// handled elsewhere.
pub struct AcceptAllSigner;

#[async_trait]
impl Signer for AcceptAllSigner {
    async fn sign(&self, document_id: &str, _signature_ref: &str) -> Result<(), SignerError> {
        log::debug!("Accepting signature for document {}", document_id);
        Ok(())
    }
}
