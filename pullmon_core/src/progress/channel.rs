use std::sync::RwLock;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::types::types::ProgressEvent;

/// Buffer capacity of the per-job broadcast channel. A pull emits at most a
/// few hundred events over its lifetime; a subscriber that still manages to
/// lag skips ahead rather than reorder.
const CHANNEL_CAPACITY: usize = 256;

/// Per-job fan-out of [`ProgressEvent`]s to any number of subscribers.
///
/// Every subscriber observes events in publication order. Subscribing is
/// forward-only: a late subscriber receives the next published event, never
/// historical ones. After [`close`](NotificationChannel::close), publishing
/// becomes a no-op (straggler signals are tolerated) and open subscriptions
/// end cleanly.
pub struct NotificationChannel {
    sender: RwLock<Option<broadcast::Sender<ProgressEvent>>>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender: RwLock::new(Some(tx)),
        }
    }

    /// Deliver `event` to all current subscribers. Zero subscribers and a
    /// closed channel are both fine; the event is silently dropped.
    pub fn publish(&self, event: ProgressEvent) {
        if let Ok(guard) = self.sender.read() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(event);
            }
        }
    }

    /// Open a subscription starting at the next published event. On a closed
    /// channel the subscription yields an already-ended stream.
    ///
    /// Unsubscribing is dropping the returned [`Subscription`]; other
    /// subscribers are unaffected.
    pub fn subscribe(&self) -> Subscription {
        if let Ok(guard) = self.sender.read() {
            if let Some(tx) = guard.as_ref() {
                return Subscription { rx: tx.subscribe() };
            }
        }
        Subscription::closed()
    }

    /// Close the channel: subscribers drain buffered events, then see the
    /// end of the stream.
    pub fn close(&self) {
        if let Ok(mut guard) = self.sender.write() {
            guard.take();
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.sender.read() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's lazy sequence of progress events for a single job.
pub struct Subscription {
    rx: broadcast::Receiver<ProgressEvent>,
}

impl Subscription {
    /// Next event in publication order, or `None` once the channel closed
    /// and all buffered events were drained.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("[channel] subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// A subscription whose stream has already ended. Returned for jobs that
    /// are retired or were never started.
    pub fn closed() -> Self {
        let (tx, rx) = broadcast::channel(1);
        drop(tx);
        Self { rx }
    }
}
