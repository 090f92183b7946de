//! Remote catalogue contract
//!
//! The sync orchestrator and the fallback resolver only know this trait; the
//! HTTP implementation lives in `provider-hymnal-api`.

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::{AudioTrack, HymnFull, HymnStatistics, HymnSummary};
use crate::pagination::Page;

/// Read access to the remote hymn catalogue
///
/// Implementations own their retry and memoization policy. Every error
/// returned here has already exhausted those retries.
#[async_trait]
pub trait HymnCatalog: Send + Sync {
    /// One page of the full catalogue, ordered by hymn number
    async fn list_hymns(&self, page: u32, page_size: u32) -> CatalogResult<Page<HymnSummary>>;

    /// `Ok(None)` when the server has no such hymn
    async fn get_by_number(&self, number: u32) -> CatalogResult<Option<HymnSummary>>;

    /// Hymn with verses and derived lyrics
    async fn get_full(&self, number: u32) -> CatalogResult<Option<HymnFull>>;

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>>;

    async fn get_random(&self) -> CatalogResult<Option<HymnSummary>>;

    async fn get_statistics(&self) -> CatalogResult<HymnStatistics>;

    async fn get_by_author(
        &self,
        author: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>>;

    /// Hymns numbered `lo..=hi`
    async fn get_by_range(
        &self,
        lo: u32,
        hi: u32,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>>;

    /// Hymns that have a recording
    async fn list_audio(&self, page: u32, page_size: u32) -> CatalogResult<Page<AudioTrack>>;

    /// `Ok(None)` when the hymn is unknown or has no recording
    async fn audio_for_hymn(&self, number: u32) -> CatalogResult<Option<AudioTrack>>;
}
