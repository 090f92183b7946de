//! Short-lived memo of successful API responses
//!
//! Entries are keyed by request path plus query string (for example
//! `/api/hinos?page=1&limit=20`) so that a whole endpoint family can be
//! invalidated by prefix.

use bridge_traits::time::Clock;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

struct CachedResponse {
    body: Bytes,
    stored_at: DateTime<Utc>,
}

/// LRU response cache with a fixed time-to-live
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CachedResponse>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    /// Fresh body for `key`; expired entries are evicted on access
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();

        let fresh = match entries.get(key) {
            Some(entry) => self.is_fresh(entry.stored_at, now),
            None => return None,
        };

        if fresh {
            entries.get(key).map(|entry| entry.body.clone())
        } else {
            debug!(key, "Evicting expired response");
            entries.pop(key);
            None
        }
    }

    pub async fn put(&self, key: impl Into<String>, body: Bytes) {
        let entry = CachedResponse {
            body,
            stored_at: self.clock.now(),
        };
        self.entries.lock().await.put(key.into(), entry);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Drop every entry whose key starts with `prefix`
    ///
    /// Returns the number of entries removed.
    pub async fn clear_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().await;

        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key);
        }

        doomed.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn is_fresh(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - stored_at).to_std() {
            Ok(age) => age < self.ttl,
            // Clock moved backwards; keep the entry
            Err(_) => true,
        }
    }
}
