//! Notification channel used by the engine and the batch coordinator.

use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::broadcast::events::{EngineEvent, Notification};

/// Fire-and-forget publisher. Implementations must not block and may
/// deliver an event more than once.
pub trait NotificationChannel: Send + Sync {
    fn publish(&self, topic: &str, event: EngineEvent);
}

/// Broadcasts engine events to in-process subscribers.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: Arc<broadcast::Sender<Notification>>,
}

impl NotificationBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Creates a new subscriber for notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Subscribes as a stream. Lagged receivers skip the missed events and
    /// keep going; the stream ends when the broadcaster is dropped.
    pub fn stream(&self) -> impl Stream<Item = Notification> + Send + 'static {
        let rx = self.sender.subscribe();
        futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => return Some((notification, rx)),
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Notification subscriber lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl NotificationChannel for NotificationBroadcaster {
    fn publish(&self, topic: &str, event: EngineEvent) {
        // No active receivers is fine
        let _ = self.sender.send(Notification::new(topic, event));
    }
}
