//! Offline hymn store
//!
//! Persists the catalogue under three fixed keys of a host
//! [`KeyValueStore`]. Writes overwrite whole values and propagate storage
//! failures. Reads never fail: missing, unreadable or corrupt data is a cache
//! miss.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, KeyValueStore};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::error::{LibraryError, Result};
use crate::models::{CacheSnapshot, CacheStats, HymnFull, HymnSummary};

/// Summary list, JSON array
pub const SUMMARIES_KEY: &str = "hymns-cache";
/// Full-record list, JSON array
pub const FULL_RECORDS_KEY: &str = "hymns-full-cache";
/// Epoch milliseconds of the last successful summary save
pub const LAST_SYNC_KEY: &str = "last-sync-time";

/// Default freshness window for a completed sync
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Local hymn cache over a key-value store
#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    cache_validity: Duration,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            clock,
            cache_validity: DEFAULT_CACHE_VALIDITY,
        }
    }

    pub fn with_cache_validity(mut self, validity: Duration) -> Self {
        self.cache_validity = validity;
        self
    }

    pub fn cache_validity(&self) -> Duration {
        self.cache_validity
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Replace the summary list and stamp the sync time, atomically
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn save_summaries(&self, items: &[HymnSummary]) -> Result<()> {
        let payload = serde_json::to_string(items)?;
        let stamp = self.clock.unix_timestamp_millis().to_string();

        let mut tx = self.kv.begin_transaction().await?;
        tx.set_string(SUMMARIES_KEY, &payload).await?;
        tx.set_string(LAST_SYNC_KEY, &stamp).await?;
        tx.commit().await?;

        info!(count = items.len(), "Saved hymn summaries");
        Ok(())
    }

    /// Replace the full-record list; the sync time is left untouched
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn save_full(&self, items: &[HymnFull]) -> Result<()> {
        let payload = serde_json::to_string(items)?;
        self.kv.set_string(FULL_RECORDS_KEY, &payload).await?;

        info!(count = items.len(), "Saved full hymn records");
        Ok(())
    }

    /// Delete all cached data. Safe to call on an empty store.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.kv.begin_transaction().await?;
        for key in [SUMMARIES_KEY, FULL_RECORDS_KEY, LAST_SYNC_KEY] {
            tx.delete(key).await?;
        }
        tx.commit().await?;

        info!("Cleared local hymn cache");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub async fn load_summaries(&self) -> Vec<HymnSummary> {
        self.load_list(SUMMARIES_KEY).await
    }

    pub async fn load_full(&self) -> Vec<HymnFull> {
        self.load_list(FULL_RECORDS_KEY).await
    }

    pub async fn find_by_number(&self, number: u32) -> Option<HymnSummary> {
        self.load_summaries()
            .await
            .into_iter()
            .find(|hymn| hymn.number == number)
    }

    pub async fn find_full_by_number(&self, number: u32) -> Option<HymnFull> {
        self.load_full()
            .await
            .into_iter()
            .find(|hymn| hymn.number() == number)
    }

    /// Case-insensitive match on title or author, or a prefix match on the
    /// hymn number
    pub async fn search(&self, query: &str) -> Vec<HymnSummary> {
        let term = query.trim().to_lowercase();

        self.load_summaries()
            .await
            .into_iter()
            .filter(|hymn| matches_query(hymn, &term))
            .collect()
    }

    /// Case-insensitive substring match on the author
    pub async fn find_by_author(&self, author: &str) -> Vec<HymnSummary> {
        let term = author.trim().to_lowercase();

        self.load_summaries()
            .await
            .into_iter()
            .filter(|hymn| {
                hymn.author
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&term))
            })
            .collect()
    }

    /// Hymns numbered `lo..=hi`, ascending
    pub async fn find_by_range(&self, lo: u32, hi: u32) -> Vec<HymnSummary> {
        let mut hymns: Vec<_> = self
            .load_summaries()
            .await
            .into_iter()
            .filter(|hymn| (lo..=hi).contains(&hymn.number))
            .collect();

        hymns.sort_by_key(|hymn| hymn.number);
        hymns
    }

    /// Uniformly random stored hymn, `None` when the store is empty
    pub async fn random_item(&self) -> Option<HymnSummary> {
        let mut hymns = self.load_summaries().await;
        if hymns.is_empty() {
            return None;
        }

        let index = rand::rng().random_range(0..hymns.len());
        Some(hymns.swap_remove(index))
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.read_raw(LAST_SYNC_KEY).await?;

        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);

        if parsed.is_none() {
            warn!(value = %raw, "Ignoring unreadable sync timestamp");
        }
        parsed
    }

    /// `true` iff a sync timestamp exists and is younger than the validity
    /// window
    pub async fn is_cache_valid(&self) -> bool {
        let Some(last_sync) = self.last_sync_time().await else {
            return false;
        };

        let age = self.clock.now() - last_sync;
        let validity = chrono::Duration::from_std(self.cache_validity)
            .unwrap_or(chrono::Duration::MAX);

        let valid = age < validity;
        debug!(valid, age_secs = age.num_seconds(), "Checked cache validity");
        valid
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            total_items: self.load_summaries().await.len(),
            last_update: self.last_sync_time().await,
        }
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        let stats = self.stats().await;

        CacheSnapshot {
            has_local_data: stats.total_items > 0,
            total_items: stats.total_items,
            last_update: stats.last_update,
            cache_valid: self.is_cache_valid().await,
        }
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        match self.kv.get_string(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Local store read failed, treating as empty");
                None
            }
        }
    }

    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.read_raw(key).await else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => {
                debug!(key, count = items.len(), "Loaded cached list");
                items
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding corrupt cached list");
                Vec::new()
            }
        }
    }
}

fn matches_query(hymn: &HymnSummary, term: &str) -> bool {
    hymn.title.to_lowercase().contains(term)
        || hymn
            .author
            .as_deref()
            .is_some_and(|a| a.to_lowercase().contains(term))
        || hymn.number.to_string().starts_with(term)
}

/// Validate an inclusive number range before querying
pub fn check_range(lo: u32, hi: u32) -> Result<()> {
    if lo > hi {
        return Err(LibraryError::InvalidInput {
            field: "range".to_string(),
            message: format!("start {} is after end {}", lo, hi),
        });
    }
    Ok(())
}
