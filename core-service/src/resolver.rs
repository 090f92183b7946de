//! # Fallback Resolver
//!
//! Wraps every remote catalogue read with a local-store fallback so the app
//! keeps working offline after one successful sync.
//!
//! ## Policy
//!
//! Each operation tries the remote catalogue first. When that fails:
//! - the failure is logged and a `FallbackUsed` event is emitted
//! - the equivalent local query runs with the same filter and pagination
//! - if the local store has nothing to offer, the original remote error is
//!   returned as [`CoreError::Unavailable`]
//!
//! With a network monitor attached, summary reads skip the remote call
//! entirely while the monitor reports no connectivity and local data
//! exists. Full-record reads and statistics always ask the remote first.
//!
//! Local data counts as usable when the store holds at least one summary
//! (full records for [`get_full`](FallbackResolver::get_full)). Filtered
//! queries over a non-empty store return their local result even when it
//! is empty. Statistics have no local equivalent and always propagate.

use bridge_traits::network::NetworkMonitor;
use core_library::store::check_range;
use core_library::{
    paginate, AudioTrack, CatalogError, HymnCatalog, HymnFull, HymnStatistics, HymnSummary,
    LocalStore, Page,
};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{CoreError, Result};

/// Remote-first reads with transparent local fallback
#[derive(Clone)]
pub struct FallbackResolver {
    catalog: Arc<dyn HymnCatalog>,
    store: LocalStore,
    events: EventBus,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
}

impl FallbackResolver {
    pub fn new(catalog: Arc<dyn HymnCatalog>, store: LocalStore, events: EventBus) -> Self {
        Self {
            catalog,
            store,
            events,
            network_monitor: None,
        }
    }

    /// Serve summary reads locally while `monitor` reports no connectivity
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    #[instrument(skip(self))]
    pub async fn list_hymns(&self, page: u32, page_size: u32) -> Result<Page<HymnSummary>> {
        if !self.offline_with_local_data("list_hymns").await {
            match self.catalog.list_hymns(page, page_size).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("list_hymns", e).await?,
            }
        }

        let hymns = self.store.load_summaries().await;
        Ok(paginate(&hymns, page, page_size))
    }

    #[instrument(skip(self))]
    pub async fn get_by_number(&self, number: u32) -> Result<Option<HymnSummary>> {
        if !self.offline_with_local_data("get_by_number").await {
            match self.catalog.get_by_number(number).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("get_by_number", e).await?,
            }
        }

        Ok(self.store.find_by_number(number).await)
    }

    #[instrument(skip(self))]
    pub async fn get_full(&self, number: u32) -> Result<Option<HymnFull>> {
        match self.catalog.get_full(number).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.degrade("get_full", &e.to_string());
                let records = self.store.load_full().await;
                if records.is_empty() {
                    return Err(CoreError::unavailable("get_full", e));
                }
                Ok(records.into_iter().find(|r| r.number() == number))
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<HymnSummary>> {
        if !self.offline_with_local_data("search").await {
            match self.catalog.search(query, page, page_size).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("search", e).await?,
            }
        }

        let hymns = self.store.search(query).await;
        Ok(paginate(&hymns, page, page_size))
    }

    #[instrument(skip(self))]
    pub async fn get_by_author(
        &self,
        author: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<HymnSummary>> {
        if !self.offline_with_local_data("get_by_author").await {
            match self.catalog.get_by_author(author, page, page_size).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("get_by_author", e).await?,
            }
        }

        let hymns = self.store.find_by_author(author).await;
        Ok(paginate(&hymns, page, page_size))
    }

    /// Hymns numbered `lo..=hi`; `lo > hi` is rejected before any I/O
    #[instrument(skip(self))]
    pub async fn get_by_range(
        &self,
        lo: u32,
        hi: u32,
        page: u32,
        page_size: u32,
    ) -> Result<Page<HymnSummary>> {
        check_range(lo, hi)?;

        if !self.offline_with_local_data("get_by_range").await {
            match self.catalog.get_by_range(lo, hi, page, page_size).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("get_by_range", e).await?,
            }
        }

        let hymns = self.store.find_by_range(lo, hi).await;
        Ok(paginate(&hymns, page, page_size))
    }

    #[instrument(skip(self))]
    pub async fn get_random(&self) -> Result<Option<HymnSummary>> {
        if !self.offline_with_local_data("get_random").await {
            match self.catalog.get_random().await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("get_random", e).await?,
            }
        }

        Ok(self.store.random_item().await)
    }

    /// No local equivalent; failures propagate
    #[instrument(skip(self))]
    pub async fn get_statistics(&self) -> Result<HymnStatistics> {
        self.catalog
            .get_statistics()
            .await
            .map_err(|e| CoreError::unavailable("get_statistics", e))
    }

    #[instrument(skip(self))]
    pub async fn list_audio(&self, page: u32, page_size: u32) -> Result<Page<AudioTrack>> {
        if !self.offline_with_local_data("list_audio").await {
            match self.catalog.list_audio(page, page_size).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("list_audio", e).await?,
            }
        }

        let tracks: Vec<AudioTrack> = self
            .store
            .load_summaries()
            .await
            .iter()
            .filter_map(AudioTrack::from_summary)
            .collect();
        Ok(paginate(&tracks, page, page_size))
    }

    #[instrument(skip(self))]
    pub async fn audio_for_hymn(&self, number: u32) -> Result<Option<AudioTrack>> {
        if !self.offline_with_local_data("audio_for_hymn").await {
            match self.catalog.audio_for_hymn(number).await {
                Ok(result) => return Ok(result),
                Err(e) => self.ensure_local_data("audio_for_hymn", e).await?,
            }
        }

        Ok(self
            .store
            .find_by_number(number)
            .await
            .as_ref()
            .and_then(AudioTrack::from_summary))
    }

    /// `true` when the monitor reports no connectivity and summaries are
    /// stored; the remote call is then skipped
    async fn offline_with_local_data(&self, operation: &str) -> bool {
        let Some(monitor) = &self.network_monitor else {
            return false;
        };
        if monitor.is_connected().await || !self.has_local_data().await {
            return false;
        }

        debug!(operation, "Offline, serving local data");
        self.degrade(operation, "network unavailable");
        true
    }

    /// Called after a remote failure; `Unavailable` when nothing is stored
    async fn ensure_local_data(&self, operation: &str, error: CatalogError) -> Result<()> {
        self.degrade(operation, &error.to_string());

        if !self.has_local_data().await {
            return Err(CoreError::unavailable(operation, error));
        }
        Ok(())
    }

    async fn has_local_data(&self) -> bool {
        !self.store.load_summaries().await.is_empty()
    }

    fn degrade(&self, operation: &str, reason: &str) {
        warn!(operation, "Remote read skipped or failed, using local data: {}", reason);
        self.events
            .emit(CoreEvent::Catalog(CatalogEvent::FallbackUsed {
                operation: operation.to_string(),
                reason: reason.to_string(),
            }))
            .ok();
    }
}
