//! Controllable subscription source for testing.
//!
//! [`MockSource`] emits values on demand, so runtime and application tests
//! can inject events without a terminal or a clock.
//!
//! ```
//! use apidesk::subscription::{Subscription, mock::MockSource};
//!
//! let mock = MockSource::<i32>::new();
//! let subscription = Subscription::new(mock.clone());
//! assert_eq!(mock.receiver_count(), 0);
//! # drop(subscription);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::{SubscriptionId, SubscriptionSource};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A subscription source that emits values when told to.
///
/// Clones share the underlying broadcast channel, so a test can hold one
/// clone while the application's `subscriptions()` hands out another.
#[derive(Debug, Clone)]
pub struct MockSource<T: Clone> {
    sender: broadcast::Sender<T>,
    id: SubscriptionId,
}

impl<T: Clone + Send + 'static> MockSource<T> {
    /// Creates a source buffering at most `capacity` undelivered values.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            id: SubscriptionId::of::<Self>(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Emits a value to every running stream.
    ///
    /// # Errors
    ///
    /// Returns the value back if no stream is listening.
    pub fn emit(&self, value: T) -> Result<usize, broadcast::error::SendError<T>> {
        self.sender.send(value)
    }

    /// Number of running streams.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone + Send + 'static> Default for MockSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> SubscriptionSource for MockSource<T> {
    type Output = T;

    fn stream(&self) -> BoxStream<'static, T> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(|result| async move { result.ok() })
            .boxed()
    }

    fn id(&self) -> SubscriptionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Subscription;

    #[test]
    fn test_emit_requires_receiver() {
        let mock = MockSource::<i32>::new();
        assert!(mock.emit(42).is_err());

        let _rx = mock.sender.subscribe();
        assert_eq!(mock.emit(42).expect("should emit to receiver"), 1);
    }

    #[test]
    fn test_instances_have_distinct_ids() {
        let a = MockSource::<i32>::new();
        let b = MockSource::<i32>::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[tokio::test]
    async fn test_stream_receives_values() {
        let mock = MockSource::<i32>::new();
        let mut stream = Subscription::new(mock.clone()).into_stream();

        mock.emit(1).expect("should emit to stream");
        mock.emit(2).expect("should emit to stream");

        assert_eq!(stream.next().await, Some(1));
        assert_eq!(stream.next().await, Some(2));
    }
}
