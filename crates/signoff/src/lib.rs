pub mod aggregate;
pub mod batch;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod status;
pub mod store;

pub use aggregate::{RejectedDocument, RequestAggregateView, RequestSummary};
pub use batch::{
    BatchHandle, BatchOutcome, BatchProgress, BatchReport, BatchSigningCoordinator, Signer,
    SignerError,
};
pub use broadcast::{EngineEvent, NotificationBroadcaster, NotificationChannel};
pub use config::{load_config, load_config_from_str, EngineConfig, LoggingConfig};
pub use engine::{
    SubjectKind, SubjectRef, Transition, TransitionEngine, TransitionEvent, TransitionOutcome,
};
pub use error::{
    CollaboratorFailure, ConfigError, Result, SignoffError, StoreError, TransitionError,
};
pub use logging::init_logging;
pub use model::{Actor, Document, DocumentUpload, Request, Role, TemplateVariable};
pub use service::RequestService;
pub use status::{RequestStatus, UnknownStatus};
pub use store::{MemoryStore, RequestStore, SqliteStore};
