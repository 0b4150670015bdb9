//! Bulk signing.

pub mod coordinator;
pub mod progress;
pub mod signer;

pub use coordinator::{
    BatchHandle, BatchOutcome, BatchReport, BatchSigningCoordinator, FailedDocument,
};
pub use progress::{BatchProgress, ProgressTable};
pub use signer::{AcceptAllSigner, Signer, SignerError};
