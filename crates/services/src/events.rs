//! Change notifications for views that render derived data.

use lms_core::model::UserId;
use tokio::sync::broadcast;

/// Events buffered per subscriber before the slowest one starts lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LmsEvent {
    /// A user's progress map was replaced.
    ProgressUpdated { user_id: UserId },
    /// The locally cached catalog changed.
    CoursesUpdated,
}

/// Publish/subscribe hub passed explicitly to the services that emit events.
///
/// Each subscriber holds a [`broadcast::Receiver`]; dropping it unsubscribes.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LmsEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receiver for every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LmsEvent> {
        self.sender.subscribe()
    }

    /// Delivers `event` to every current subscriber. Publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, event: LmsEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "published event"),
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(?event, "no subscribers for event");
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
