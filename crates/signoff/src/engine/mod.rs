//! Request and document lifecycle.

pub mod event;
pub mod locks;
pub mod table;
pub mod transition;

pub use event::{SubjectKind, SubjectRef, Transition, TransitionEvent};
pub use locks::{RequestGuard, RequestLocks};
pub use table::{available_actions, ActorRequirement};
pub use transition::{TransitionEngine, TransitionOutcome};
