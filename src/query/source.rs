use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::api::ApiError;
use crate::subscription::{SubscriptionId, SubscriptionSource};

use super::client::{Invalidation, LiveKey, QueryClient};
use super::key::QueryKey;

/// The state of a read query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// The query is disabled and issues no request.
    Idle,
    /// No data yet; a request is running.
    Loading,
    /// Data is available.
    Success {
        data: T,
        /// The data was invalidated and a refetch is running or pending.
        is_stale: bool,
    },
    /// The last request failed. Kept until the key is invalidated.
    Error(ApiError),
}

/// A query result containing the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub state: QueryState<T>,
}

impl<T> QueryResult<T> {
    pub const fn new(state: QueryState<T>) -> Self {
        Self { state }
    }

    /// Returns the data if the query succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub const fn error(&self) -> Option<&ApiError> {
        match &self.state {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, QueryState::Idle)
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }

    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self::new(QueryState::Idle)
    }
}

type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

/// A read query: a subscription that fetches through the [`QueryClient`]
/// and emits a [`QueryResult`] whenever its state changes.
///
/// When started:
///
/// 1. cached data is emitted immediately; otherwise `Loading` is emitted
/// 2. if the data is missing or stale, it is fetched (shared with any other
///    query on the same key) and the outcome emitted
/// 3. when the key is invalidated, the stale data is emitted and refetched
///
/// A disabled query emits `Idle` once and never fetches. While an enabled
/// query runs, its cache entry is exempt from garbage collection.
///
/// ```
/// use apidesk::api::ApiError;
/// use apidesk::query::{Query, QueryClient, QueryKey};
/// use apidesk::subscription::Subscription;
/// use futures::FutureExt;
///
/// enum Message {
///     Count(apidesk::query::QueryResult<u32>),
/// }
///
/// let client = QueryClient::new();
/// let query = Query::new(
///     QueryKey::from("count"),
///     || async { Ok::<_, ApiError>(3) }.boxed(),
///     client,
/// );
/// let subscription = Subscription::new(query).map(Message::Count);
/// # drop(subscription);
/// ```
pub struct Query<V> {
    key: QueryKey,
    fetcher: Fetcher<V>,
    client: QueryClient,
    enabled: bool,
}

impl<V> fmt::Debug for Query<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<V> Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new<F>(key: QueryKey, fetcher: F, client: QueryClient) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(fetcher),
            client,
            enabled: true,
        }
    }

    /// Sets whether the query may issue requests.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

enum State {
    Initial,
    Fetching {
        rx: broadcast::Receiver<Invalidation>,
    },
    Watching {
        rx: broadcast::Receiver<Invalidation>,
    },
}

impl<V> SubscriptionSource for Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = QueryResult<V>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        if !self.enabled {
            return stream::once(async { QueryResult::new(QueryState::Idle) }).boxed();
        }

        let key = self.key.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let client = self.client.clone();
        let live = client.track(&key);

        let states = stream::unfold(State::Initial, move |state| {
            let key = key.clone();
            let fetcher = Arc::clone(&fetcher);
            let client = client.clone();

            async move {
                match state {
                    State::Initial => {
                        // Subscribe before fetching so an invalidation that
                        // lands mid-request is not lost.
                        let rx = client.subscribe_invalidation();
                        match client.cached::<V>(&key) {
                            Some((data, false)) => {
                                let result = QueryState::Success {
                                    data,
                                    is_stale: false,
                                };
                                Some((QueryResult::new(result), State::Watching { rx }))
                            }
                            cached => Some((pending(cached), State::Fetching { rx })),
                        }
                    }

                    State::Fetching { rx } => {
                        let state = match client.fetch(&key, || fetcher()).await {
                            Ok(data) => QueryState::Success {
                                data,
                                is_stale: false,
                            },
                            Err(err) => {
                                tracing::debug!(%key, error = %err, "query failed");
                                QueryState::Error(err)
                            }
                        };
                        Some((QueryResult::new(state), State::Watching { rx }))
                    }

                    State::Watching { mut rx } => loop {
                        match rx.recv().await {
                            Ok(invalidation) if invalidation.matches(&key) => {
                                let cached = client.cached::<V>(&key);
                                return Some((pending(cached), State::Fetching { rx }));
                            }
                            Ok(_) => {}
                            Err(RecvError::Lagged(skipped)) => {
                                // Missed notifications may have named our key.
                                tracing::trace!(%key, skipped, "invalidations lagged");
                                let cached = client.cached::<V>(&key);
                                return Some((pending(cached), State::Fetching { rx }));
                            }
                            Err(RecvError::Closed) => return None,
                        }
                    },
                }
            }
        });
        Tracked {
            inner: states.boxed(),
            _live: live,
        }
        .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

/// A query stream holding its key live for as long as it is polled.
struct Tracked<S> {
    inner: S,
    _live: LiveKey,
}

impl<S: Stream + Unpin> Stream for Tracked<S> {
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// What to show while a fetch runs: the cached data marked stale, or
/// `Loading` when there is none.
fn pending<V>(cached: Option<(V, bool)>) -> QueryResult<V> {
    QueryResult::new(match cached {
        Some((data, _)) => QueryState::Success {
            data,
            is_stale: true,
        },
        None => QueryState::Loading,
    })
}

impl<V> Hash for Query<V> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.key.hash(hasher);
        self.enabled.hash(hasher);
    }
}
