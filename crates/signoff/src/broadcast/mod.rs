//! Broadcasting of lifecycle events for real-time observers.
//!
//! Status changes and signing progress are published through the
//! `NotificationChannel` trait so hosts can plug in their own transport;
//! `NotificationBroadcaster` is the in-process implementation.

pub mod events;
pub mod notifier;

pub use events::{
    EngineEvent, Notification, SigningProgress, StatusChanged, PROGRESS_TOPIC, STATUS_TOPIC,
};
pub use notifier::{NotificationBroadcaster, NotificationChannel};
