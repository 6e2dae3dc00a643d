//! Periodic ticks.
//!
//! The application uses a [`Timer`] to expire transient notifications and to
//! sweep expired entries out of the query cache.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_stream::wrappers::IntervalStream;

use super::{SubscriptionId, SubscriptionSource};

/// A tick, carrying the instant it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick(pub Instant);

/// Emits a [`Tick`] at a fixed period.
///
/// Missed ticks are skipped rather than replayed. The first tick fires one
/// full period after the subscription starts.
///
/// ```
/// use std::time::Duration;
/// use apidesk::subscription::{Subscription, time::Timer};
///
/// enum Message {
///     Tick,
/// }
///
/// let sub = Subscription::new(Timer::every(Duration::from_secs(1))).map(|_| Message::Tick);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timer {
    period: Duration,
}

impl Timer {
    #[must_use]
    pub const fn every(period: Duration) -> Self {
        Self { period }
    }

    pub const fn period(&self) -> Duration {
        self.period
    }
}

impl SubscriptionSource for Timer {
    type Output = Tick;

    fn stream(&self) -> BoxStream<'static, Tick> {
        let mut interval = interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        IntervalStream::new(interval)
            .skip(1) // first tick of tokio's interval is immediate
            .map(Tick)
            .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}
