use futures_util::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::{Notification, NotificationView};
use crate::ports::Clock;
use crate::store::NotificationStore;
use crate::types::Result;

/// Capacity of each subscriber's buffer
pub const SUBSCRIBER_BUFFER: usize = 100;

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Notification>,
}

/// user id -> live subscribers of that user
#[derive(Clone, Default)]
struct SubscriberIndex(Arc<RwLock<HashMap<String, Vec<Subscriber>>>>);

impl SubscriberIndex {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert(&self, user_id: &str, subscriber: Subscriber) {
        self.write()
            .entry(user_id.to_string())
            .or_default()
            .push(subscriber);
    }

    fn remove(&self, user_id: &str, id: u64) {
        let mut index = self.write();
        if let Some(subscribers) = index.get_mut(user_id) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                index.remove(user_id);
            }
        }
    }
}

pub struct NotificationBus {
    store: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
    index: SubscriberIndex,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new(store: Arc<dyn NotificationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            index: SubscriberIndex::default(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Persist, then offer to every live subscriber of the recipient.
    ///
    /// Only persistence can fail the call. A subscriber whose buffer is full
    /// misses this notification.
    pub async fn publish(&self, notification: Notification) -> Result<()> {
        self.store.insert(&notification).await?;

        let index = self.index.read();
        let Some(subscribers) = index.get(&notification.user_id) else {
            return Ok(());
        };

        for subscriber in subscribers {
            match subscriber.sender.try_send(notification.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        user_id = %notification.user_id,
                        subscriber = subscriber.id,
                        "Subscriber buffer full, live notification dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber = subscriber.id, "Subscriber already closed");
                }
            }
        }
        Ok(())
    }

    /// Live notifications for `user_id` from now on, until `cancel` fires
    /// (or its sender is dropped) or the stream is dropped.
    pub fn subscribe(&self, user_id: &str, cancel: oneshot::Receiver<()>) -> NotificationStream {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.index.insert(user_id, Subscriber { id, sender });

        let cancelled = Arc::new(AtomicBool::new(false));
        let watcher = {
            let cancelled = cancelled.clone();
            let index = self.index.clone();
            let user_id = user_id.to_string();
            tokio::spawn(async move {
                let _ = cancel.await;
                cancelled.store(true, Ordering::SeqCst);
                // Dropping the sender wakes a pending consumer
                index.remove(&user_id, id);
            })
        };

        debug!(user_id = %user_id, subscriber = id, "Notification subscriber added");
        NotificationStream {
            id,
            user_id: user_id.to_string(),
            receiver,
            cancelled,
            index: self.index.clone(),
            watcher,
            done: false,
        }
    }

    /// Number of live subscribers of `user_id`
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.index.read().get(user_id).map_or(0, Vec::len)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationView>> {
        self.store.list_for_user(user_id).await
    }

    pub async fn mark_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        self.store
            .mark_read(user_id, notification_id, self.clock.now())
            .await
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        self.store.mark_all_read(user_id, self.clock.now()).await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64> {
        self.store.unread_count(user_id).await
    }
}

/// A subscriber's view of the bus.
///
/// Ends once the cancel signal fires; anything still buffered at that point
/// is discarded.
pub struct NotificationStream {
    id: u64,
    user_id: String,
    receiver: mpsc::Receiver<Notification>,
    cancelled: Arc<AtomicBool>,
    index: SubscriberIndex,
    watcher: tokio::task::JoinHandle<()>,
    done: bool,
}

impl NotificationStream {
    fn close(&mut self) {
        self.done = true;
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        self.index.remove(&self.user_id, self.id);
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        if this.cancelled.load(Ordering::SeqCst) {
            this.close();
            return Poll::Ready(None);
        }

        match this.receiver.poll_recv(cx) {
            Poll::Ready(Some(_)) if this.cancelled.load(Ordering::SeqCst) => {
                this.close();
                Poll::Ready(None)
            }
            Poll::Ready(Some(notification)) => Poll::Ready(Some(notification)),
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for NotificationStream {
    fn drop(&mut self) {
        self.watcher.abort();
        if !self.done {
            self.index.remove(&self.user_id, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NotificationType;
    use crate::ports::ManualClock;
    use crate::store::MemoryStore;
    use futures_util::StreamExt;

    fn bus() -> NotificationBus {
        NotificationBus::new(Arc::new(MemoryStore::new()), Arc::new(ManualClock::default()))
    }

    fn note(user_id: &str, n: usize) -> Notification {
        Notification::new(
            user_id,
            NotificationType::NewAcknowledgement,
            "New acknowledgement",
            format!("#{}", n),
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_no_backlog() {
        let bus = bus();
        bus.publish(note("u1", 0)).await.unwrap();

        let (_cancel, rx) = oneshot::channel();
        let mut stream = bus.subscribe("u1", rx);
        bus.publish(note("u1", 1)).await.unwrap();

        let received = stream.next().await.unwrap();
        assert_eq!(received.message, "#1");
    }

    #[tokio::test]
    async fn test_only_recipient_receives() {
        let bus = bus();
        let (_c1, rx1) = oneshot::channel();
        let (_c2, rx2) = oneshot::channel();
        let mut alice = bus.subscribe("alice", rx1);
        let mut bob = bus.subscribe("bob", rx2);

        bus.publish(note("alice", 1)).await.unwrap();
        assert_eq!(alice.next().await.unwrap().user_id, "alice");
        assert!(futures_util::poll!(bob.next()).is_pending());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let bus = bus();
        let (_cancel, rx) = oneshot::channel();
        let stream = bus.subscribe("u1", rx);
        assert_eq!(bus.subscriber_count("u1"), 1);

        drop(stream);
        assert_eq!(bus.subscriber_count("u1"), 0);
        bus.publish(note("u1", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_closes_stream() {
        let bus = bus();
        let (cancel, rx) = oneshot::channel();
        let mut stream = bus.subscribe("u1", rx);
        bus.publish(note("u1", 1)).await.unwrap();

        cancel.send(()).unwrap();
        while bus.subscriber_count("u1") > 0 {
            tokio::task::yield_now().await;
        }
        assert!(stream.next().await.is_none());
        assert_eq!(bus.subscriber_count("u1"), 0);
    }
}
