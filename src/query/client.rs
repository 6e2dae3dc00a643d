use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::StreamExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::broadcast;

use crate::api::ApiError;
use crate::command::Command;

use super::cache::CacheEntry;
use super::config::QueryConfig;
use super::key::QueryKey;

type Erased = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Erased, ApiError>>>;

type LiveKeys = Arc<DashMap<QueryKey, usize>>;

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

/// Which cached reads an invalidation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    All,
    Key(QueryKey),
    Prefix(QueryKey),
}

impl Invalidation {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Self::All => true,
            Self::Key(k) => k == key,
            Self::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

/// Central cache for read queries.
///
/// The `QueryClient` handles:
/// - caching decoded results per [`QueryKey`]
/// - sharing one in-flight request between concurrent readers of a key
/// - marking entries stale and broadcasting invalidations to live queries
/// - keeping entries that a running query still shows out of garbage
///   collection
///
/// Clones share the same cache.
///
/// ```
/// use apidesk::query::{QueryClient, QueryConfig};
/// use std::time::Duration;
///
/// let client = QueryClient::with_config(QueryConfig::new(
///     Duration::from_secs(30),  // stale_time
///     Duration::from_secs(300), // cache_time
/// ));
/// assert!(client.is_empty());
/// ```
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<DashMap<QueryKey, CacheEntry<Erased>>>,
    in_flight: Arc<DashMap<QueryKey, InFlight>>,
    live: LiveKeys,
    generation: Arc<AtomicU64>,
    invalidation_tx: broadcast::Sender<Invalidation>,
    config: QueryConfig,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("cached", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .field("live", &self.live.len())
            .field("config", &self.config)
            .finish()
    }
}

impl QueryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (invalidation_tx, _) = broadcast::channel(100);
        Self {
            cache: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            live: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            invalidation_tx,
            config,
        }
    }

    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns the value for `key`, fetching it only when needed.
    ///
    /// - a fresh cached value is returned without a request
    /// - if a request for `key` is already running, its result is awaited
    /// - otherwise `fetcher` is called once and its result cached on success
    ///
    /// Errors are not cached; the next call fetches again.
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error, or [`ApiError::Decode`] if the key is
    /// already associated with a value of a different type.
    pub async fn fetch<V, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<V, ApiError>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        if let Some(data) = self.fresh::<V>(key) {
            tracing::trace!(%key, "cache hit");
            return Ok(data);
        }

        let erased = self.join_or_start(key, fetcher).await?;
        erased.downcast_ref::<V>().cloned().ok_or_else(|| type_mismatch(key))
    }

    fn join_or_start<V, F, Fut>(&self, key: &QueryKey, fetcher: F) -> SharedFetch
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::trace!(%key, "joining in-flight request");
                entry.get().fetch.clone()
            }
            Entry::Vacant(entry) => {
                tracing::debug!(%key, "fetching");
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let request = fetcher();
                let client = self.clone();
                let key = key.clone();

                let fetch = async move {
                    let result = request.await.map(|data| Arc::new(data) as Erased);
                    // Only the request still registered for the key may
                    // publish; an invalidation in the meantime unregisters it.
                    let current = client
                        .in_flight
                        .remove_if(&key, |_, f| f.generation == generation)
                        .is_some();
                    if let (true, Ok(data)) = (current, &result) {
                        client.cache.insert(key, CacheEntry::new(Arc::clone(data)));
                    }
                    result
                }
                .boxed()
                .shared();

                entry.insert(InFlight {
                    generation,
                    fetch: fetch.clone(),
                });
                fetch
            }
        }
    }

    /// Returns a fresh cached value for `key`.
    fn fresh<V: Clone + 'static>(&self, key: &QueryKey) -> Option<V> {
        let mut entry = self.cache.get_mut(key)?;
        if entry.check_staleness(self.config.stale_time) {
            return None;
        }
        entry.data.downcast_ref::<V>().cloned()
    }

    /// Returns the cached value for `key` and whether it is stale.
    pub fn cached<V: Clone + 'static>(&self, key: &QueryKey) -> Option<(V, bool)> {
        let mut entry = self.cache.get_mut(key)?;
        let is_stale = entry.check_staleness(self.config.stale_time);
        entry.data.downcast_ref::<V>().cloned().map(|data| (data, is_stale))
    }

    /// Seeds the cache with a value, as if it had just been fetched.
    pub fn set_cached<V: Send + Sync + 'static>(&self, key: QueryKey, data: V) {
        self.cache.insert(key, CacheEntry::new(Arc::new(data) as Erased));
    }

    /// Whether `key` is cached and stale. `None` when not cached.
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.cache
            .get_mut(key)
            .map(|mut entry| entry.check_staleness(self.config.stale_time))
    }

    /// Marks every cached read stale and notifies all live queries.
    pub fn invalidate_all(&self) {
        self.apply(Invalidation::All);
    }

    /// Marks one key stale and notifies its live queries.
    pub fn invalidate(&self, key: &QueryKey) {
        self.apply(Invalidation::Key(key.clone()));
    }

    /// Marks every key starting with `prefix` stale.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        self.apply(Invalidation::Prefix(prefix.clone()));
    }

    fn apply(&self, invalidation: Invalidation) {
        let mut marked = 0usize;
        for mut entry in self.cache.iter_mut() {
            if invalidation.matches(entry.key()) {
                entry.value_mut().mark_stale();
                marked += 1;
            }
        }
        // Requests started before the invalidation must not publish.
        self.in_flight.retain(|key, _| !invalidation.matches(key));

        tracing::debug!(?invalidation, marked, "invalidated queries");
        // No live queries is not an error.
        let _ = self.invalidation_tx.send(invalidation);
    }

    /// Returns a command that marks `key` stale, making its live queries
    /// fetch again. Produces no messages.
    pub fn refetch<Msg>(&self, key: &QueryKey) -> Command<Msg>
    where
        Msg: Send + 'static,
    {
        let client = self.clone();
        let key = key.clone();
        Command::stream(
            futures::stream::once(async move { client.invalidate(&key) })
                .filter_map(|()| async { None }),
        )
    }

    /// Drops entries older than `cache_time` that no running query shows.
    /// Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let before = self.cache.len();
        let cache_time = self.config.cache_time;
        self.cache
            .retain(|key, entry| self.live.contains_key(key) || !entry.should_gc(cache_time));
        let removed = before.saturating_sub(self.cache.len());
        if removed > 0 {
            tracing::debug!(removed, "collected expired cache entries");
        }
        removed
    }

    /// Marks `key` as shown by a running query until the guard is dropped.
    pub fn track(&self, key: &QueryKey) -> LiveKey {
        *self.live.entry(key.clone()).or_insert(0) += 1;
        LiveKey {
            live: Arc::clone(&self.live),
            key: key.clone(),
        }
    }

    /// Whether a running query currently shows `key`.
    pub fn is_live(&self, key: &QueryKey) -> bool {
        self.live.contains_key(key)
    }

    pub(crate) fn subscribe_invalidation(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidation_tx.subscribe()
    }
}

/// Keeps a key out of garbage collection while held. See
/// [`QueryClient::track`].
#[must_use]
pub struct LiveKey {
    live: LiveKeys,
    key: QueryKey,
}

impl fmt::Debug for LiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LiveKey").field(&self.key).finish()
    }
}

impl Drop for LiveKey {
    fn drop(&mut self) {
        if let Entry::Occupied(mut entry) = self.live.entry(self.key.clone()) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
            }
        }
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

fn type_mismatch(key: &QueryKey) -> ApiError {
    ApiError::Decode(format!("cached value for `{key}` has a different type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
        value: i32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<i32, ApiError>> {
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_fetch_caches_result() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from("users");

        assert_eq!(client.fetch(&key, counting_fetch(calls.clone(), 1)).await, Ok(1));
        assert_eq!(client.fetch(&key, counting_fetch(calls.clone(), 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from(["data", "1"]);

        let (a, b, c) = tokio::join!(
            client.fetch(&key, counting_fetch(calls.clone(), 10)),
            client.fetch(&key, counting_fetch(calls.clone(), 20)),
            client.fetch(&key, counting_fetch(calls.clone(), 30)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!((a, b, c), (Ok(10), Ok(10), Ok(10)));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let client = QueryClient::new();
        let key = QueryKey::from("users");

        let err = client
            .fetch::<i32, _, _>(&key, || async { Err(ApiError::Network("down".to_string())) })
            .await;
        assert!(err.is_err());
        assert!(client.is_empty());

        let ok = client.fetch(&key, || async { Ok(5) }).await;
        assert_eq!(ok, Ok(5));
    }

    #[tokio::test]
    async fn test_invalidate_all_marks_every_entry_stale() {
        let client = QueryClient::new();
        client.set_cached(QueryKey::from(["data", "1"]), 1);
        client.set_cached(QueryKey::from("users"), 2);

        client.invalidate_all();

        assert_eq!(client.is_stale(&QueryKey::from(["data", "1"])), Some(true));
        assert_eq!(client.is_stale(&QueryKey::from("users")), Some(true));
        assert_eq!(client.is_stale(&QueryKey::from("missing")), None);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let client = QueryClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::from("users");

        assert_eq!(client.fetch(&key, counting_fetch(calls.clone(), 1)).await, Ok(1));
        client.invalidate_all();
        assert_eq!(client.fetch(&key, counting_fetch(calls.clone(), 2)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.is_stale(&key), Some(false));
    }

    #[tokio::test]
    async fn test_invalidate_prefix_is_scoped() {
        let client = QueryClient::new();
        client.set_cached(QueryKey::from(["data", "1"]), 1);
        client.set_cached(QueryKey::from(["data", "2"]), 2);
        client.set_cached(QueryKey::from("users"), 3);

        client.invalidate_prefix(&QueryKey::from("data"));

        assert_eq!(client.is_stale(&QueryKey::from(["data", "1"])), Some(true));
        assert_eq!(client.is_stale(&QueryKey::from(["data", "2"])), Some(true));
        assert_eq!(client.is_stale(&QueryKey::from("users")), Some(false));
    }

    #[tokio::test]
    async fn test_request_started_before_invalidation_does_not_publish() {
        let client = QueryClient::new();
        let key = QueryKey::from("users");

        let slow = client.fetch(&key, || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(1)
        });
        let invalidate = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            client.invalidate_all();
        };
        let (value, ()) = tokio::join!(slow, invalidate);

        // The caller still gets its answer, but the cache is not seeded.
        assert_eq!(value, Ok(1));
        assert!(client.cached::<i32>(&key).is_none());
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_decode_error() {
        let client = QueryClient::with_config(QueryConfig::new(
            Duration::from_secs(0),
            Duration::from_secs(60),
        ));
        let key = QueryKey::from("shared");

        let (a, b) = tokio::join!(
            client.fetch(&key, || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(1_i32)
            }),
            client.fetch(&key, || async { Ok("text".to_string()) }),
        );
        assert_eq!(a, Ok(1));
        assert!(matches!(b, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_invalidation_is_broadcast() {
        let client = QueryClient::new();
        let mut rx = client.subscribe_invalidation();

        client.invalidate(&QueryKey::from("users"));

        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("notification within timeout")
            .expect("channel open");
        assert_eq!(received, Invalidation::Key(QueryKey::from("users")));
    }

    #[tokio::test]
    async fn test_refetch_command_produces_no_messages() {
        let client = QueryClient::new();
        client.set_cached(QueryKey::from("users"), 1);

        let cmd: Command<()> = client.refetch(&QueryKey::from("users"));
        assert!(cmd.collect_messages().await.is_empty());
        assert_eq!(client.is_stale(&QueryKey::from("users")), Some(true));
    }

    #[test]
    fn test_collect_garbage() {
        let client = QueryClient::with_config(QueryConfig::new(
            Duration::MAX,
            Duration::from_millis(5),
        ));
        client.set_cached(QueryKey::from("old"), 1);
        std::thread::sleep(Duration::from_millis(10));
        client.set_cached(QueryKey::from("new"), 2);

        assert_eq!(client.collect_garbage(), 1);
        assert!(client.cached::<i32>(&QueryKey::from("new")).is_some());
    }

    #[test]
    fn test_collect_garbage_keeps_live_keys() {
        let client = QueryClient::with_config(QueryConfig::new(
            Duration::MAX,
            Duration::from_millis(5),
        ));
        let key = QueryKey::from(["data", "1"]);
        client.set_cached(key.clone(), 1);

        let first = client.track(&key);
        let second = client.track(&key);
        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(client.collect_garbage(), 0);
        drop(first);
        assert!(client.is_live(&key));
        assert_eq!(client.collect_garbage(), 0);

        drop(second);
        assert!(!client.is_live(&key));
        assert_eq!(client.collect_garbage(), 1);
    }

    #[test]
    fn test_invalidation_matching() {
        let key = QueryKey::from(["data", "3"]);
        assert!(Invalidation::All.matches(&key));
        assert!(Invalidation::Key(key.clone()).matches(&key));
        assert!(!Invalidation::Key(QueryKey::from("data")).matches(&key));
        assert!(Invalidation::Prefix(QueryKey::from("data")).matches(&key));
    }
}
