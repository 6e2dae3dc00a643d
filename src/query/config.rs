use std::time::Duration;

/// Configuration for query caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long fetched data is considered fresh.
    ///
    /// Fresh data is served from the cache without a request. The default
    /// never expires: entries stay fresh until a write invalidates them or a
    /// view asks for a refetch.
    pub stale_time: Duration,

    /// How long an entry is retained after it was fetched before
    /// [`QueryClient::collect_garbage`](super::QueryClient::collect_garbage)
    /// drops it.
    pub cache_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::MAX,
            cache_time: Duration::from_secs(5 * 60),
        }
    }
}

impl QueryConfig {
    #[must_use]
    pub const fn new(stale_time: Duration, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
        }
    }
}
