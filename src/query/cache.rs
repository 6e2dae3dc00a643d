use std::time::{Duration, Instant};

/// A cached payload with its fetch time and staleness flag.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at: Instant,
    pub is_stale: bool,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            is_stale: false,
        }
    }

    /// Marks the entry stale if it is older than `stale_time`; returns the
    /// resulting staleness. Once stale, an entry stays stale until replaced.
    pub fn check_staleness(&mut self, stale_time: Duration) -> bool {
        if self.fetched_at.elapsed() > stale_time {
            self.is_stale = true;
        }
        self.is_stale
    }

    pub const fn mark_stale(&mut self) {
        self.is_stale = true;
    }

    /// Whether the entry has outlived `cache_time`.
    pub fn should_gc(&self, cache_time: Duration) -> bool {
        self.fetched_at.elapsed() > cache_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_new_entry_is_fresh() {
        let entry = CacheEntry::new(42);
        assert_eq!(entry.data, 42);
        assert!(!entry.is_stale);
    }

    #[test]
    fn test_check_staleness() {
        let mut entry = CacheEntry::new(42);
        assert!(!entry.check_staleness(Duration::from_secs(1)));
        assert!(!entry.check_staleness(Duration::MAX));

        sleep(Duration::from_millis(10));
        assert!(entry.check_staleness(Duration::from_millis(5)));
        // Stays stale even with a longer window.
        assert!(entry.check_staleness(Duration::from_secs(60)));
    }

    #[test]
    fn test_mark_stale() {
        let mut entry = CacheEntry::new(42);
        entry.mark_stale();
        assert!(entry.is_stale);
    }

    #[test]
    fn test_should_gc() {
        let entry = CacheEntry::new(());
        assert!(!entry.should_gc(Duration::from_secs(60)));
        sleep(Duration::from_millis(10));
        assert!(entry.should_gc(Duration::from_millis(5)));
    }
}
