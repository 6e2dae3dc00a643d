//! Toast-style notifications raised by write hooks.
//!
//! A [`Notifier`] is a broadcast feed. Hooks push into it; the application
//! subscribes to it like any other event source and shows the latest entry
//! in its status line.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::subscription::{SubscriptionId, SubscriptionSource};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub text: String,
}

impl Notification {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Broadcast feed of notifications. Clones share the feed.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    id: SubscriptionId,
}

impl Notifier {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self {
            tx,
            id: SubscriptionId::of::<Self>(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    pub fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Error => tracing::warn!(text = %notification.text, "notification"),
            Level::Success | Level::Info => {
                tracing::info!(text = %notification.text, "notification");
            }
        }
        // Nobody listening is fine; the event is only for display.
        let _ = self.tx.send(notification);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.notify(Notification::new(Level::Success, text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.notify(Notification::new(Level::Error, text));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.notify(Notification::new(Level::Info, text));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionSource for Notifier {
    type Output = Notification;

    fn stream(&self) -> BoxStream<'static, Notification> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|n| async move { n.ok() })
            .boxed()
    }

    fn id(&self) -> SubscriptionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.success("Operation successful!");
        notifier.error("Delete failed!");

        assert_eq!(
            rx.recv().await.ok(),
            Some(Notification::new(Level::Success, "Operation successful!"))
        );
        assert_eq!(
            rx.recv().await.ok(),
            Some(Notification::new(Level::Error, "Delete failed!"))
        );
    }

    #[tokio::test]
    async fn test_stream_yields_notifications() {
        let notifier = Notifier::new();
        let mut stream = notifier.stream();

        notifier.info("hello");

        let received = tokio::time::timeout(std::time::Duration::from_millis(100), stream.next())
            .await
            .expect("within timeout");
        assert_eq!(received.map(|n| n.text), Some("hello".to_string()));
    }

    #[test]
    fn test_notify_without_subscribers() {
        Notifier::new().success("nobody hears this");
    }

    #[test]
    fn test_clones_share_identity() {
        let a = Notifier::new();
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), Notifier::new().id());
    }
}
