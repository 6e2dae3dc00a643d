use std::hash::{DefaultHasher, Hash, Hasher};

use crossterm::event::{Event, EventStream};
use futures::{StreamExt, stream::BoxStream};

use super::{SubscriptionId, SubscriptionSource};

/// Terminal input events from crossterm's `EventStream`.
///
/// Read errors are forwarded as `Err` items; the stream ends when the
/// terminal closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalEvents;

impl TerminalEvents {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SubscriptionSource for TerminalEvents {
    type Output = Result<Event, std::io::Error>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        EventStream::new().boxed()
    }

    fn id(&self) -> SubscriptionId {
        // Singleton source: one constant id.
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

impl Hash for TerminalEvents {
    fn hash<H: Hasher>(&self, state: &mut H) {
        "terminal".hash(state);
    }
}
