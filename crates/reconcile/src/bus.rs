//! Change-notification fan-out.
//!
//! The event carries no data: it only tells subscribers to re-pull state
//! from the read-only query surface. Subscribers hold no cursor, and anyone
//! not subscribed at emission time never sees the event.

use tokio::sync::broadcast;
use tracing::debug;

/// Default per-subscriber buffer before a slow subscriber starts lagging.
const DEFAULT_CAPACITY: usize = 64;

/// The "data may have changed" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotification;

impl ChangeNotification {
    /// Wire name of the event.
    pub const EVENT_NAME: &'static str = "prediction_update";
}

/// Best-effort broadcast to every currently connected subscriber.
#[derive(Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<ChangeNotification>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit one event. Returns how many subscribers it reached; having none
    /// is not an error.
    pub fn broadcast(&self) -> usize {
        self.tx.send(ChangeNotification).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the bus.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeNotification>,
}

impl Subscription {
    /// Wait for the next event. Events missed while lagging collapse into a
    /// single cue. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<ChangeNotification> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "subscriber lagged, coalescing missed notifications");
                Some(ChangeNotification)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<ChangeNotification> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => Some(ChangeNotification),
            Err(_) => None,
        }
    }
}
