//! Dispatch-result cache.
//!
//! After a successful dispatch the worker records the webhook's message
//! identifier against the dispatch timestamp, giving operators a bounded
//! window to correlate webhook-side receipts with store records. Entries
//! expire after the configured TTL.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use courier_core::Clock;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;

/// Cache parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for each entry.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(24 * 60 * 60) }
    }
}

/// Write surface the dispatch engine requires from a result cache.
///
/// Workers log and swallow errors from this trait; a cache outage never
/// fails a dispatch.
#[async_trait]
pub trait DispatchCache: Send + Sync + 'static {
    /// Writes a key/value pair with the configured TTL.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

struct Entry {
    value: String,
    expires_at: std::time::Instant,
}

/// Process-local TTL cache.
///
/// Expired entries are evicted lazily: reads skip them and each write sweeps
/// the map. The map lock is never held across an await.
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl: config.ttl, clock }
    }

    /// Reads a live entry, if present.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries.get(key).filter(|entry| entry.expires_at > now).map(|entry| entry.value.clone())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries.read().values().filter(|entry| entry.expires_at > now).count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DispatchCache for InMemoryCache {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry { value: value.to_string(), expires_at: now + self.ttl },
        );
        debug!(key = %key, entries = entries.len(), "cached dispatch result");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use courier_testing::TestClock;

    use super::*;

    fn cache_with_clock(ttl: Duration) -> (InMemoryCache, Arc<TestClock>) {
        let clock = Arc::new(TestClock::new());
        let cache = InMemoryCache::new(CacheConfig { ttl }, clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (cache, _clock) = cache_with_clock(Duration::from_secs(60));

        cache.set("wh-1", "2026-08-02T10:00:00+00:00").await.expect("set should succeed");

        assert_eq!(cache.get("wh-1"), Some("2026-08-02T10:00:00+00:00".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(10));

        cache.set("wh-1", "stamp").await.expect("set should succeed");
        clock.advance(Duration::from_secs(11));

        assert_eq!(cache.get("wh-1"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(10));

        cache.set("wh-1", "a").await.expect("set should succeed");
        clock.advance(Duration::from_secs(11));
        cache.set("wh-2", "b").await.expect("set should succeed");

        // The sweep on the second write dropped the expired entry from the
        // underlying map, not just from reads.
        assert_eq!(cache.entries.read().len(), 1);
        assert_eq!(cache.get("wh-2"), Some("b".to_string()));
    }

    #[tokio::test]
    async fn set_overwrites_existing_key() {
        let (cache, _clock) = cache_with_clock(Duration::from_secs(60));

        cache.set("wh-1", "first").await.expect("set should succeed");
        cache.set("wh-1", "second").await.expect("set should succeed");

        assert_eq!(cache.get("wh-1"), Some("second".to_string()));
        assert_eq!(cache.len(), 1);
    }
}
