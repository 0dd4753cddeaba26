//! Result cache with bounded staleness and single-flight refresh
//!
//! Holds at most one entry. Readers inside the TTL get the stored `Arc`
//! without any I/O. Once the entry is stale, concurrent callers queue on one
//! refresh lock; the first runs the loader and the rest pick up its result.
//!
//! ```text
//!  caller A ─┐                         ┌─► loader (one fan-out)
//!  caller B ─┼──► refresh lock ────────┤
//!  caller C ─┘   (B, C wait)           └─► entry swapped, B and C reuse it
//! ```

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::clock::Clock;

/// Where the cache stands relative to its TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheState::Empty => "empty",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
        };
        f.write_str(s)
    }
}

/// One stored result, replaced whole on refresh
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub captured_at: DateTime<Utc>,
    generation: u64,
}

impl<T> CacheEntry<T> {
    /// Increases by one on every store
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a lookup returned and whether it avoided the loader
#[derive(Debug)]
pub struct CacheLookup<T> {
    pub entry: Arc<CacheEntry<T>>,
    /// `false` only for the caller whose loader produced the entry
    pub cached: bool,
}

/// Single-entry TTL cache
pub struct SignalCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<Arc<CacheEntry<T>>>>,
    refresh: Mutex<()>,
    generation: AtomicU64,
}

impl<T> SignalCache<T> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn state(&self) -> CacheState {
        match self.entry.read().as_ref() {
            None => CacheState::Empty,
            Some(entry) if self.is_fresh(entry) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    /// Current entry regardless of age
    pub fn peek(&self) -> Option<Arc<CacheEntry<T>>> {
        self.entry.read().clone()
    }

    pub fn clear(&self) {
        *self.entry.write() = None;
    }

    /// Return the fresh entry, or refresh through `loader` exactly once
    /// for all callers that find the cache stale at the same time
    pub async fn get_or_refresh<F, Fut>(&self, loader: F) -> CacheLookup<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(entry) = self.fresh() {
            debug!("Cache hit (generation {})", entry.generation);
            return CacheLookup {
                entry,
                cached: true,
            };
        }

        let seen = self.current_generation();
        let _guard = self.refresh.lock().await;

        if let Some(entry) = self.fresh().or_else(|| self.newer_than(seen)) {
            debug!("Reusing refresh completed while waiting");
            return CacheLookup {
                entry,
                cached: true,
            };
        }

        self.store(loader().await)
    }

    /// Refresh regardless of TTL. A refresh that finished while this caller
    /// waited for the lock is returned instead of starting another.
    pub async fn force_refresh<F, Fut>(&self, loader: F) -> CacheLookup<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let seen = self.current_generation();
        let _guard = self.refresh.lock().await;

        if let Some(entry) = self.newer_than(seen) {
            debug!("Forced refresh satisfied by a concurrent one");
            return CacheLookup {
                entry,
                cached: true,
            };
        }

        self.store(loader().await)
    }

    fn is_fresh(&self, entry: &CacheEntry<T>) -> bool {
        self.clock.now() - entry.captured_at < self.ttl
    }

    fn fresh(&self) -> Option<Arc<CacheEntry<T>>> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| self.is_fresh(entry))
            .cloned()
    }

    fn newer_than(&self, generation: u64) -> Option<Arc<CacheEntry<T>>> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| entry.generation > generation)
            .cloned()
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn store(&self, value: T) -> CacheLookup<T> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let entry = Arc::new(CacheEntry {
            value,
            captured_at: self.clock.now(),
            generation,
        });
        *self.entry.write() = Some(Arc::clone(&entry));
        debug!("Cache refreshed (generation {})", generation);

        CacheLookup {
            entry,
            cached: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicUsize;

    fn cache(ttl_secs: i64) -> (Arc<ManualClock>, Arc<SignalCache<usize>>) {
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(SignalCache::new(
            Duration::seconds(ttl_secs),
            clock.clone() as Arc<dyn Clock>,
        ));
        (clock, cache)
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_loader() {
        let (clock, cache) = cache(180);
        assert_eq!(cache.state(), CacheState::Empty);

        let first = cache.get_or_refresh(|| async { 1 }).await;
        assert!(!first.cached);
        assert_eq!(cache.state(), CacheState::Fresh);

        clock.advance(Duration::seconds(179));
        let second = cache.get_or_refresh(|| async { 2 }).await;
        assert!(second.cached);
        assert!(Arc::ptr_eq(&first.entry, &second.entry));
        assert_eq!(second.entry.value, 1);
    }

    #[tokio::test]
    async fn test_stale_after_ttl() {
        let (clock, cache) = cache(180);
        cache.get_or_refresh(|| async { 1 }).await;

        clock.advance(Duration::seconds(180));
        assert_eq!(cache.state(), CacheState::Stale);

        let refreshed = cache.get_or_refresh(|| async { 2 }).await;
        assert!(!refreshed.cached);
        assert_eq!(refreshed.entry.value, 2);
        assert_eq!(refreshed.entry.generation(), 2);
    }

    #[tokio::test]
    async fn test_clear_empties() {
        let (_clock, cache) = cache(180);
        cache.get_or_refresh(|| async { 1 }).await;
        cache.clear();
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.peek().is_none());
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_ttl() {
        let (_clock, cache) = cache(180);
        cache.get_or_refresh(|| async { 1 }).await;

        let forced = cache.force_refresh(|| async { 2 }).await;
        assert!(!forced.cached);
        assert_eq!(forced.entry.value, 2);
    }

    #[tokio::test]
    async fn test_concurrent_stale_callers_share_one_load() {
        let (_clock, cache) = cache(180);
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                tokio::spawn(async move {
                    cache
                        .get_or_refresh(|| async move {
                            loads.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                            7
                        })
                        .await
                        .entry
                        .value
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_forced_refreshes_share_one_load() {
        // Nothing is ever fresh, so waiters rely on the generation check
        let (_clock, cache) = cache(0);
        let loads = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            tokio::spawn(async move {
                let lookup = cache
                    .force_refresh(|| async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        42
                    })
                    .await;
                (lookup.entry.value, lookup.cached)
            })
        };
        started_rx.await.unwrap();

        // Queue the followers behind the refresh lock while the leader loads
        let followers: Vec<_> = (0..7)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                tokio::spawn(async move {
                    let lookup = cache
                        .force_refresh(|| async move {
                            loads.fetch_add(1, Ordering::SeqCst);
                            i
                        })
                        .await;
                    (lookup.entry.value, lookup.cached)
                })
            })
            .collect();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        release_tx.send(()).unwrap();

        assert_eq!(leader.await.unwrap(), (42, false));
        for follower in followers {
            assert_eq!(follower.await.unwrap(), (42, true));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek().unwrap().generation(), 1);
    }
}
