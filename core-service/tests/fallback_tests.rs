//! Integration tests for the fallback resolver
//!
//! These tests verify:
//! - Offline reads match the online answers once the catalogue is synced
//! - Random picks come from the stored catalogue
//! - Reads with no local data surface the remote error
//! - Statistics never fall back
//! - A disconnected network skips the remote call when local data exists

use async_trait::async_trait;
use bridge_desktop::SqliteKeyValueStore;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::network::{NetworkInfo, NetworkMonitor, NetworkType};
use bridge_traits::time::FixedClock;
use core_library::{
    paginate, AudioTrack, CatalogError, CatalogResult, HymnCatalog, HymnFull, HymnStatistics,
    HymnSummary, LibraryError, LocalStore, Page,
};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use core_service::{CoreError, FallbackResolver};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Fakes
// ============================================================================

/// In-memory catalogue that can be switched offline
struct SwitchableCatalog {
    hymns: Vec<HymnSummary>,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchableCatalog {
    fn new(hymns: Vec<HymnSummary>) -> Self {
        Self {
            hymns,
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> CatalogResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CatalogError::Transport("connection refused".to_string()))
        }
    }

    fn filtered(&self, keep: impl Fn(&HymnSummary) -> bool) -> Vec<HymnSummary> {
        self.hymns.iter().filter(|h| keep(h)).cloned().collect()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[async_trait]
impl HymnCatalog for SwitchableCatalog {
    async fn list_hymns(&self, page: u32, page_size: u32) -> CatalogResult<Page<HymnSummary>> {
        self.check()?;
        Ok(paginate(&self.hymns, page, page_size))
    }

    async fn get_by_number(&self, number: u32) -> CatalogResult<Option<HymnSummary>> {
        self.check()?;
        Ok(self.hymns.iter().find(|h| h.number == number).cloned())
    }

    async fn get_full(&self, _number: u32) -> CatalogResult<Option<HymnFull>> {
        self.check()?;
        Ok(None)
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>> {
        self.check()?;
        let hits = self.filtered(|h| {
            contains_ci(&h.title, query)
                || h.author.as_deref().is_some_and(|a| contains_ci(a, query))
                || h.number.to_string().starts_with(query.trim())
        });
        Ok(paginate(&hits, page, page_size))
    }

    async fn get_random(&self) -> CatalogResult<Option<HymnSummary>> {
        self.check()?;
        Ok(self.hymns.first().cloned())
    }

    async fn get_statistics(&self) -> CatalogResult<HymnStatistics> {
        self.check()?;
        let with_audio = self.hymns.iter().filter(|h| h.has_audio()).count() as u64;
        Ok(HymnStatistics {
            total_items: self.hymns.len() as u64,
            items_with_audio: with_audio,
            percent_with_audio: 0.0,
        })
    }

    async fn get_by_author(
        &self,
        author: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>> {
        self.check()?;
        let hits = self.filtered(|h| h.author.as_deref().is_some_and(|a| contains_ci(a, author)));
        Ok(paginate(&hits, page, page_size))
    }

    async fn get_by_range(
        &self,
        lo: u32,
        hi: u32,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>> {
        self.check()?;
        let hits = self.filtered(|h| (lo..=hi).contains(&h.number));
        Ok(paginate(&hits, page, page_size))
    }

    async fn list_audio(&self, page: u32, page_size: u32) -> CatalogResult<Page<AudioTrack>> {
        self.check()?;
        let tracks: Vec<_> = self.hymns.iter().filter_map(AudioTrack::from_summary).collect();
        Ok(paginate(&tracks, page, page_size))
    }

    async fn audio_for_hymn(&self, number: u32) -> CatalogResult<Option<AudioTrack>> {
        self.check()?;
        Ok(self
            .hymns
            .iter()
            .find(|h| h.number == number)
            .and_then(AudioTrack::from_summary))
    }
}

struct StaticNetwork(bool);

#[async_trait]
impl NetworkMonitor for StaticNetwork {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(if self.0 {
            NetworkInfo::connected(NetworkType::WiFi)
        } else {
            NetworkInfo::disconnected()
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn sample_hymns() -> Vec<HymnSummary> {
    (1..=25)
        .map(|n| {
            let hymn = HymnSummary::new(n, format!("Hino {}", n));
            let hymn = if n % 3 == 0 {
                hymn.with_author("Sarah Kalley")
            } else {
                hymn.with_author("Robert Kalley")
            };
            if n % 4 == 0 {
                hymn.with_audio_url(format!("https://hymns.test/audio/{:03}.mp3", n))
            } else {
                hymn
            }
        })
        .collect()
}

struct Fixture {
    catalog: Arc<SwitchableCatalog>,
    store: LocalStore,
    events: EventBus,
    resolver: FallbackResolver,
}

async fn fixture(hymns: Vec<HymnSummary>) -> Fixture {
    let kv = Arc::new(SqliteKeyValueStore::in_memory().await.unwrap());
    let store = LocalStore::new(kv, Arc::new(FixedClock::at_millis(1_700_000_000_000)));
    let catalog = Arc::new(SwitchableCatalog::new(hymns));
    let events = EventBus::default();
    let resolver = FallbackResolver::new(catalog.clone(), store.clone(), events.clone());

    Fixture {
        catalog,
        store,
        events,
        resolver,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_offline_answers_match_online_answers() {
    let hymns = sample_hymns();
    let fx = fixture(hymns.clone()).await;
    fx.store.save_summaries(&hymns).await.unwrap();

    let r = &fx.resolver;
    let online = (
        r.list_hymns(2, 10).await.unwrap(),
        r.get_by_number(12).await.unwrap(),
        r.search("hino 1", 1, 5).await.unwrap(),
        r.get_by_author("sarah", 1, 20).await.unwrap(),
        r.get_by_range(5, 14, 2, 4).await.unwrap(),
        r.list_audio(1, 3).await.unwrap(),
        r.audio_for_hymn(8).await.unwrap(),
    );

    fx.catalog.go_offline();

    let offline = (
        r.list_hymns(2, 10).await.unwrap(),
        r.get_by_number(12).await.unwrap(),
        r.search("hino 1", 1, 5).await.unwrap(),
        r.get_by_author("sarah", 1, 20).await.unwrap(),
        r.get_by_range(5, 14, 2, 4).await.unwrap(),
        r.list_audio(1, 3).await.unwrap(),
        r.audio_for_hymn(8).await.unwrap(),
    );

    assert_eq!(online, offline);
    assert_eq!(offline.0.total, 25);
    assert_eq!(offline.0.total_pages, 3);
    assert_eq!(offline.3.total, 8);
    assert_eq!(offline.5.total, 6);
    assert_eq!(offline.6.unwrap().filename, "008.mp3");
}

#[tokio::test]
async fn test_offline_filtered_reads_may_be_empty() {
    let hymns = sample_hymns();
    let fx = fixture(hymns.clone()).await;
    fx.store.save_summaries(&hymns).await.unwrap();
    fx.catalog.go_offline();

    let page = fx.resolver.get_by_author("Unknown", 1, 20).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);

    assert!(fx.resolver.get_by_number(999).await.unwrap().is_none());
    assert!(fx.resolver.audio_for_hymn(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_offline_random_comes_from_store() {
    let stored: Vec<_> = (1..=5)
        .map(|n| HymnSummary::new(n, format!("Hino {}", n)))
        .collect();
    let fx = fixture(sample_hymns()).await;
    fx.store.save_summaries(&stored).await.unwrap();
    fx.catalog.go_offline();

    for _ in 0..100 {
        let hymn = fx.resolver.get_random().await.unwrap().unwrap();
        assert!((1..=5).contains(&hymn.number));
    }
}

#[tokio::test]
async fn test_offline_without_local_data_is_unavailable() {
    let fx = fixture(sample_hymns()).await;
    fx.catalog.go_offline();

    let expected = CatalogError::Transport("connection refused".to_string());

    match fx.resolver.list_hymns(1, 20).await {
        Err(CoreError::Unavailable { operation, source }) => {
            assert_eq!(operation, "list_hymns");
            assert_eq!(source, expected);
        }
        other => panic!("expected Unavailable, got {:?}", other),
    }

    assert!(matches!(
        fx.resolver.get_random().await,
        Err(CoreError::Unavailable { .. })
    ));
    assert!(matches!(
        fx.resolver.search("hino", 1, 20).await,
        Err(CoreError::Unavailable { .. })
    ));
    assert!(matches!(
        fx.resolver.list_audio(1, 20).await,
        Err(CoreError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn test_statistics_never_fall_back() {
    let hymns = sample_hymns();
    let fx = fixture(hymns.clone()).await;
    fx.store.save_summaries(&hymns).await.unwrap();

    let stats = fx.resolver.get_statistics().await.unwrap();
    assert_eq!(stats.total_items, 25);
    assert_eq!(stats.items_with_audio, 6);

    fx.catalog.go_offline();
    let mut events = fx.events.subscribe();

    assert!(matches!(
        fx.resolver.get_statistics().await,
        Err(CoreError::Unavailable { .. })
    ));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_range_rejected_before_remote_call() {
    let fx = fixture(sample_hymns()).await;

    let result = fx.resolver.get_by_range(10, 5, 1, 20).await;
    assert!(matches!(
        result,
        Err(CoreError::Library(LibraryError::InvalidInput { .. }))
    ));
}

#[tokio::test]
async fn test_fallback_is_announced_once_per_read() {
    let hymns = sample_hymns();
    let fx = fixture(hymns.clone()).await;
    fx.store.save_summaries(&hymns).await.unwrap();
    fx.catalog.go_offline();
    let mut events = fx.events.subscribe();

    fx.resolver.search("kalley", 1, 20).await.unwrap();

    match events.recv().await.unwrap() {
        CoreEvent::Catalog(CatalogEvent::FallbackUsed { operation, reason }) => {
            assert_eq!(operation, "search");
            assert!(reason.contains("connection refused"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnected_network_serves_local_data_without_remote_call() {
    let hymns = sample_hymns();
    let fx = fixture(hymns.clone()).await;
    fx.store.save_summaries(&hymns).await.unwrap();
    let resolver = fx
        .resolver
        .clone()
        .with_network_monitor(Arc::new(StaticNetwork(false)));
    let mut events = fx.events.subscribe();

    let page = resolver.list_hymns(2, 10).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(page.items[0].number, 11);

    assert_eq!(resolver.search("hino 2", 1, 20).await.unwrap().total, 7);
    assert_eq!(resolver.get_by_range(3, 5, 1, 20).await.unwrap().items.len(), 3);
    assert!(resolver.get_random().await.unwrap().is_some());
    assert_eq!(
        resolver.audio_for_hymn(4).await.unwrap().unwrap().filename,
        "004.mp3"
    );

    assert_eq!(fx.catalog.calls(), 0);

    match events.recv().await.unwrap() {
        CoreEvent::Catalog(CatalogEvent::FallbackUsed { operation, reason }) => {
            assert_eq!(operation, "list_hymns");
            assert_eq!(reason, "network unavailable");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_disconnected_network_without_local_data_still_asks_remote() {
    let fx = fixture(sample_hymns()).await;
    let resolver = fx
        .resolver
        .clone()
        .with_network_monitor(Arc::new(StaticNetwork(false)));

    let page = resolver.list_hymns(1, 20).await.unwrap();
    assert_eq!(page.total, 25);
    assert_eq!(fx.catalog.calls(), 1);
}

#[tokio::test]
async fn test_connected_network_reads_remote_first() {
    let hymns = sample_hymns();
    let fx = fixture(hymns.clone()).await;
    fx.store.save_summaries(&hymns[..5]).await.unwrap();
    let resolver = fx
        .resolver
        .clone()
        .with_network_monitor(Arc::new(StaticNetwork(true)));

    assert_eq!(resolver.list_hymns(1, 20).await.unwrap().total, 25);
    assert_eq!(fx.catalog.calls(), 1);
}
