//! Long-lived event sources.
//!
//! A [`Subscription`] wraps a [`SubscriptionSource`]: terminal input, a timer,
//! the notification feed, or a cached [`Query`](crate::query::Query). The
//! runtime starts and stops subscriptions by comparing their
//! [`SubscriptionId`]s after every update.

pub mod mock;
pub mod terminal;
pub mod time;

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Action;

/// Identity of a subscription: the source type plus a hash of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    type_id: TypeId,
    hash: u64,
}

impl SubscriptionId {
    /// Builds an id for source type `T` with the given parameter hash.
    pub fn of<T: 'static>(hash: u64) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            hash,
        }
    }

    /// Derives a new id that also depends on type `T`.
    fn with<T: 'static>(self) -> Self {
        let mut hasher = DefaultHasher::new();
        self.hash.hash(&mut hasher);
        TypeId::of::<T>().hash(&mut hasher);
        Self {
            type_id: self.type_id,
            hash: hasher.finish(),
        }
    }
}

/// A source of events that can be turned into a stream.
pub trait SubscriptionSource: Send + 'static {
    type Output;

    /// Creates a fresh stream of events. Called once each time the
    /// subscription is started.
    fn stream(&self) -> BoxStream<'static, Self::Output>;

    /// Identity used to decide whether a running subscription is kept.
    fn id(&self) -> SubscriptionId;
}

/// A type-erased subscription producing messages of type `Msg`.
pub struct Subscription<Msg> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: Box<dyn Fn() -> BoxStream<'static, Msg> + Send>,
}

impl<Msg: Send + 'static> Subscription<Msg> {
    /// Wraps a source.
    pub fn new<S>(source: S) -> Self
    where
        S: SubscriptionSource<Output = Msg>,
    {
        Self {
            id: source.id(),
            spawn: Box::new(move || source.stream()),
        }
    }

    /// Transforms every event with `f`.
    ///
    /// The id also depends on the type of `f`, so one source mapped into two
    /// different messages counts as two subscriptions.
    pub fn map<F, T>(self, f: F) -> Subscription<T>
    where
        F: Fn(Msg) -> T + Clone + Send + Sync + 'static,
        T: Send + 'static,
    {
        let spawn = self.spawn;
        Subscription {
            id: self.id.with::<F>(),
            spawn: Box::new(move || {
                let f = f.clone();
                spawn().map(f).boxed()
            }),
        }
    }

    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Starts the underlying stream directly, outside the runtime.
    pub fn into_stream(self) -> BoxStream<'static, Msg> {
        (self.spawn)()
    }
}

/// Handle for a running subscription task.
pub struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Handle {
    pub const fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { token, join }
    }

    /// Signals the task to stop without waiting for it.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Cancels the subscription and waits for task completion.
    pub async fn cancel(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

/// Keeps the set of running subscriptions in line with what the application
/// declares.
pub struct SubscriptionManager<Msg> {
    running: HashMap<SubscriptionId, Handle>,
    tx: mpsc::UnboundedSender<Action<Msg>>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    pub fn new(tx: mpsc::UnboundedSender<Action<Msg>>) -> Self {
        Self {
            running: HashMap::new(),
            tx,
        }
    }

    /// Starts new subscriptions and stops the ones no longer declared.
    pub fn update(&mut self, subscriptions: Vec<Subscription<Msg>>) {
        let wanted: HashSet<SubscriptionId> = subscriptions.iter().map(|s| s.id).collect();

        self.running.retain(|id, handle| {
            let keep = wanted.contains(id);
            if !keep {
                tracing::trace!(?id, "stopping subscription");
                handle.stop();
            }
            keep
        });

        for subscription in subscriptions {
            if self.running.contains_key(&subscription.id) {
                continue;
            }
            tracing::trace!(id = ?subscription.id, "starting subscription");
            let handle = self.spawn(subscription);
            self.running.insert(handle.0, handle.1);
        }
    }

    fn spawn(&self, subscription: Subscription<Msg>) -> (SubscriptionId, Handle) {
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();
        let mut stream = (subscription.spawn)();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    next = stream.next() => match next {
                        Some(msg) => {
                            if tx.send(Action::Message(msg)).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        (subscription.id, Handle::new(token, join))
    }

    /// Number of running subscriptions.
    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Cancels every subscription and waits for their tasks.
    pub async fn shutdown(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.cancel().await;
        }
    }
}
