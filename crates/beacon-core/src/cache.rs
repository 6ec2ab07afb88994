//! Time-bounded memoization of the window enumeration.
//!
//! The broadcaster ticks every few milliseconds while a window enumeration
//! takes tens of milliseconds.  [`WindowCache`] keeps the last successful
//! enumeration and serves it until it is older than the configured TTL.
//!
//! # Refresh semantics
//!
//! - Fresh entry: returned as-is, the source is not called.
//! - Stale or missing entry: the source is called synchronously.  On success
//!   the entry is replaced as a whole and stamped with the time the query
//!   returned; on failure the old entry is left in place and the error is
//!   returned.
//!
//! # Concurrency
//!
//! Readers share a read lock.  A refresh calls the source with no lock held
//! and takes the write lock only to swap the entry in, so two concurrent
//! misses may both hit the source.  The last writer wins.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::geometry::WindowRect;
use crate::probe::{ProbeError, WindowSource};

/// One successful enumeration and the instant it was taken.
#[derive(Debug, Clone)]
struct CacheEntry {
    windows: Arc<[WindowRect]>,
    sampled_at: Instant,
}

/// Caches [`WindowSource::list_windows`] results for a fixed TTL.
pub struct WindowCache {
    source: Box<dyn WindowSource>,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
}

impl WindowCache {
    /// Creates an empty cache in front of `source`.
    pub fn new(source: Box<dyn WindowSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the windows, refreshing from the source if the entry is stale.
    ///
    /// # Errors
    ///
    /// Returns the source's [`ProbeError`] when a refresh was needed and
    /// failed.  The previously cached windows are kept for later calls.
    pub fn get(&self) -> Result<Arc<[WindowRect]>, ProbeError> {
        self.get_with_clock(Instant::now)
    }

    /// Same as [`WindowCache::get`], with the clock frozen at `now`.
    pub fn get_at(&self, now: Instant) -> Result<Arc<[WindowRect]>, ProbeError> {
        self.get_with_clock(|| now)
    }

    /// Same as [`WindowCache::get`], reading time from `clock`.
    ///
    /// The clock is read once to judge freshness and again after the source
    /// returns.  The entry is stamped with the second reading, so a query
    /// slower than the TTL still yields an entry that is fresh on return.
    pub fn get_with_clock<C>(&self, clock: C) -> Result<Arc<[WindowRect]>, ProbeError>
    where
        C: Fn() -> Instant,
    {
        if let Some(windows) = self.fresh_entry(clock()) {
            return Ok(windows);
        }

        let windows: Arc<[WindowRect]> = self.source.list_windows()?.into();
        let sampled_at = clock();
        debug!("window cache refreshed: {} window(s)", windows.len());

        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        *entry = Some(CacheEntry {
            windows: Arc::clone(&windows),
            sampled_at,
        });
        Ok(windows)
    }

    /// Returns when the current entry was sampled, if there is one.
    pub fn sampled_at(&self) -> Option<Instant> {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|e| e.sampled_at)
    }

    fn fresh_entry(&self, now: Instant) -> Option<Arc<[WindowRect]>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|e| now.saturating_duration_since(e.sampled_at) < self.ttl)
            .map(|e| Arc::clone(&e.windows))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::MockWindowSource;

    const TTL: Duration = Duration::from_millis(100);

    fn rect(title: &str) -> WindowRect {
        WindowRect::from_bounds(title, 0, 0, 100, 100).expect("valid rect")
    }

    #[test]
    fn test_get_within_ttl_does_not_call_source_twice() {
        // Arrange: the source may be called exactly once
        let mut source = MockWindowSource::new();
        source
            .expect_list_windows()
            .times(1)
            .returning(|| Ok(vec![rect("a")]));
        let cache = WindowCache::new(Box::new(source), TTL);
        let t0 = Instant::now();

        // Act
        let first = cache.get_at(t0).expect("first");
        let second = cache.get_at(t0 + Duration::from_millis(99)).expect("second");

        // Assert
        assert_eq!(first, second);
        assert_eq!(cache.sampled_at(), Some(t0));
    }

    #[test]
    fn test_get_after_ttl_refreshes_once_and_updates_timestamp() {
        // Arrange
        let mut source = MockWindowSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_list_windows()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![rect("old")]));
        source
            .expect_list_windows()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![rect("new")]));
        let cache = WindowCache::new(Box::new(source), TTL);
        let t0 = Instant::now();
        let t1 = t0 + TTL;

        // Act
        cache.get_at(t0).expect("first");
        let refreshed = cache.get_at(t1).expect("refresh");

        // Assert
        assert_eq!(refreshed[0].title, "new");
        assert_eq!(cache.sampled_at(), Some(t1));
    }

    #[test]
    fn test_failed_refresh_keeps_previous_entry() {
        // Arrange: succeed, then fail, then the cache is still served while fresh
        let mut source = MockWindowSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_list_windows()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![rect("kept")]));
        source
            .expect_list_windows()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ProbeError::Platform("osascript timed out".to_string())));
        let cache = WindowCache::new(Box::new(source), TTL);
        let t0 = Instant::now();

        // Act
        cache.get_at(t0).expect("first");
        let result = cache.get_at(t0 + TTL * 2);

        // Assert
        assert!(matches!(result, Err(ProbeError::Platform(_))));
        assert_eq!(cache.sampled_at(), Some(t0), "timestamp must not move");
        let stale = cache.entry.read().unwrap().clone().expect("entry kept");
        assert_eq!(stale.windows[0].title, "kept");
    }

    #[test]
    fn test_failure_with_empty_cache_propagates_and_retries_next_call() {
        // Arrange
        let mut source = MockWindowSource::new();
        let mut seq = mockall::Sequence::new();
        source
            .expect_list_windows()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ProbeError::Unsupported("window enumeration")));
        source
            .expect_list_windows()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![]));
        let cache = WindowCache::new(Box::new(source), TTL);
        let t0 = Instant::now();

        // Act / Assert: a failure never populates the cache
        assert!(cache.get_at(t0).is_err());
        assert_eq!(cache.sampled_at(), None);
        let windows = cache.get_at(t0).expect("second call refreshes");
        assert!(windows.is_empty());
    }

    #[test]
    fn test_empty_enumeration_is_cached() {
        let mut source = MockWindowSource::new();
        source.expect_list_windows().times(1).returning(|| Ok(vec![]));
        let cache = WindowCache::new(Box::new(source), TTL);
        let t0 = Instant::now();

        assert!(cache.get_at(t0).expect("first").is_empty());
        assert!(cache.get_at(t0 + Duration::from_millis(50)).expect("hit").is_empty());
    }

    #[test]
    fn test_zero_ttl_always_refreshes() {
        let mut source = MockWindowSource::new();
        source
            .expect_list_windows()
            .times(3)
            .returning(|| Ok(vec![rect("a")]));
        let cache = WindowCache::new(Box::new(source), Duration::ZERO);
        let t0 = Instant::now();

        for _ in 0..3 {
            cache.get_at(t0).expect("get");
        }
    }

    #[test]
    fn test_slow_refresh_is_stamped_when_query_returns() {
        // Arrange: the query takes 150 ms of clock time against a 100 ms TTL
        let mut source = MockWindowSource::new();
        source
            .expect_list_windows()
            .times(1)
            .returning(|| Ok(vec![rect("slow")]));
        let cache = WindowCache::new(Box::new(source), TTL);
        let t0 = Instant::now();
        let readings = std::cell::RefCell::new(
            vec![t0, t0 + Duration::from_millis(150)].into_iter(),
        );

        // Act
        cache
            .get_with_clock(|| readings.borrow_mut().next().expect("two readings"))
            .expect("refresh");
        let hit = cache.get_at(t0 + Duration::from_millis(200));

        // Assert: age is measured from the end of the query
        assert_eq!(cache.sampled_at(), Some(t0 + Duration::from_millis(150)));
        assert_eq!(hit.expect("hit")[0].title, "slow");
    }

    #[test]
    fn test_ttl_reports_configured_value() {
        let cache = WindowCache::new(Box::new(MockWindowSource::new()), TTL);
        assert_eq!(cache.ttl(), TTL);
    }
}
