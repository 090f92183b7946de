//! Hymn API connector implementation
//!
//! Implements `HymnCatalog` over the public hymnal REST API.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::time::Clock;
use core_library::{
    paginate, AudioTrack, CatalogResult, HymnCatalog, HymnFull, HymnStatistics, HymnSummary,
    Page,
};
use core_runtime::config::ApiConfig;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::ResponseCache;
use crate::error::{HymnApiError, Result};
use crate::normalize::{into_full, into_statistics, into_summary, normalize_page};
use crate::types::{RawHymn, RawHymnDetail, RawHymnPage, RawStatistics};

/// Page size used to pull the whole catalogue when building audio listings
pub const AUDIO_SCAN_PAGE_SIZE: u32 = 640;

/// Whether `url` parses and uses the `http` or `https` scheme
pub fn is_valid_audio_url(url: &str) -> bool {
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Hymn API connector
///
/// # Features
///
/// - Timeout-only retry with linear backoff (`retry_delay * attempt`)
/// - Pagination normalization across the server's response shapes
/// - Short-lived LRU memo of successful responses
/// - Audio listing and availability helpers
///
/// # Example
///
/// ```ignore
/// use provider_hymnal_api::HymnApiClient;
/// use core_library::HymnCatalog;
///
/// let client = HymnApiClient::new(http_client, ApiConfig::default(), clock);
/// let page = client.list_hymns(1, 20).await?;
/// ```
pub struct HymnApiClient {
    http_client: Arc<dyn HttpClient>,
    config: ApiConfig,
    cache: ResponseCache,
    events: Option<EventBus>,
}

impl HymnApiClient {
    pub fn new(http_client: Arc<dyn HttpClient>, config: ApiConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = ResponseCache::new(
            config.response_cache_capacity,
            config.response_cache_ttl,
            clock,
        );

        Self {
            http_client,
            config,
            cache,
            events: None,
        }
    }

    /// Publish cache maintenance events on `events`
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Cache key for a path relative to the API prefix
    fn cache_key(&self, path: &str) -> String {
        format!("{}{}", self.config.api_prefix, path)
    }

    /// Execute a GET with the timeout-only retry policy
    ///
    /// Non-2xx responses and non-timeout transport failures return
    /// immediately.
    #[instrument(skip(self), fields(path = %path))]
    async fn execute_with_retry(&self, path: &str) -> Result<HttpResponse> {
        let url = self.config.endpoint(path);
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let request = HttpRequest::get(url.clone())
                .accept_json()
                .timeout(self.config.request_timeout);

            match self.http_client.execute(request).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, attempt, "API request succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    warn!(status = response.status, "API request failed");
                    return Err(HymnApiError::ApiError {
                        status_code: response.status,
                        endpoint: self.cache_key(path),
                    });
                }
                Err(e) if e.is_timeout() && attempt < max_attempts => {
                    let backoff = self.config.retry_delay * attempt;
                    warn!(
                        "API request timed out (attempt {}/{}), retrying in {}ms",
                        attempt,
                        max_attempts,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!("API request failed after {} attempt(s): {}", attempt, e);
                    return Err(HymnApiError::from_bridge(&self.cache_key(path), e, attempt));
                }
            }
        }
    }

    /// Fetch and decode `path`, consulting the response cache when `cacheable`
    ///
    /// Only bodies that decoded successfully are memoized.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, cacheable: bool) -> Result<T> {
        let key = self.cache_key(path);

        if cacheable {
            if let Some(body) = self.cache.get(&key).await {
                debug!(key = %key, "Response cache hit");
                return decode(&key, &body);
            }
        }

        let response = self.execute_with_retry(path).await?;
        let parsed = decode(&key, &response.body)?;

        if cacheable {
            self.cache.put(key, response.body).await;
        }

        Ok(parsed)
    }

    /// Fetch a listing that may legitimately omit `hinos`
    async fn get_optional_page(
        &self,
        path: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<HymnSummary>> {
        let raw: RawHymnPage = self.get_json(path, true).await?;

        if raw.hinos.is_none() {
            debug!(path, "Listing without hymns, returning empty page");
            return Ok(Page::empty(page, page_size));
        }

        Ok(normalize_page(raw, page, page_size))
    }

    /// Random hymn that has a recording, if the drawn hymn has one
    #[instrument(skip(self))]
    pub async fn random_audio(&self) -> CatalogResult<Option<AudioTrack>> {
        let hymn = self.get_random().await?;
        Ok(hymn.as_ref().and_then(AudioTrack::from_summary))
    }

    /// Search restricted to hymns with recordings
    ///
    /// Keeps the pagination reported by the search endpoint.
    #[instrument(skip(self))]
    pub async fn search_audio(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<AudioTrack>> {
        let results = self.search(query, page, page_size).await?;

        Ok(Page {
            items: results
                .items
                .iter()
                .filter_map(AudioTrack::from_summary)
                .collect(),
            total: results.total,
            page: results.page,
            total_pages: results.total_pages,
            page_size: results.page_size,
        })
    }

    /// Public URL of an audio file hosted by the API
    pub fn audio_file_url(&self, filename: &str) -> String {
        format!("{}/audio/{}", self.config.base_url, filename)
    }

    /// Whether the audio at `url` is reachable
    ///
    /// Sends a single `HEAD` with the audio probe timeout. Any failure,
    /// including an invalid URL, yields `false`.
    #[instrument(skip(self))]
    pub async fn probe_audio(&self, url: &str) -> bool {
        if !is_valid_audio_url(url) {
            debug!("Rejecting audio URL with unsupported scheme");
            return false;
        }

        let request = HttpRequest::head(url).timeout(self.config.audio_probe_timeout);

        match self.http_client.execute(request).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                debug!("Audio probe failed: {}", e);
                false
            }
        }
    }

    /// Discard every memoized response
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Response cache cleared");
        self.emit(CatalogEvent::CacheCleared { prefix: None });
    }

    /// Discard memoized responses whose key starts with `prefix`
    ///
    /// Keys include the API prefix, e.g. `/api/hinos/buscar`.
    pub async fn clear_cache_for_endpoint(&self, prefix: &str) -> usize {
        let removed = self.cache.clear_prefix(prefix).await;
        info!(prefix, removed, "Response cache entries cleared");
        self.emit(CatalogEvent::CacheCleared {
            prefix: Some(prefix.to_string()),
        });
        removed
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Catalog(event)).ok();
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| HymnApiError::ParseError(format!("Failed to parse {}: {}", key, e)))
}

#[async_trait]
impl HymnCatalog for HymnApiClient {
    #[instrument(skip(self))]
    async fn list_hymns(&self, page: u32, page_size: u32) -> CatalogResult<Page<HymnSummary>> {
        let path = format!("/hinos?page={}&limit={}", page, page_size);
        let raw: RawHymnPage = self.get_json(&path, true).await?;

        if raw.hinos.is_none() {
            return Err(HymnApiError::ParseError(format!(
                "Invalid response from {}: missing hinos",
                self.cache_key(&path)
            ))
            .into());
        }

        let page = normalize_page(raw, page, page_size);
        info!(
            "Listed {} hymns (page {}/{})",
            page.items.len(),
            page.page,
            page.total_pages
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn get_by_number(&self, number: u32) -> CatalogResult<Option<HymnSummary>> {
        let raw: RawHymnDetail = self.get_json(&format!("/hinos/{}", number), true).await?;
        Ok(into_summary(raw.hymn))
    }

    #[instrument(skip(self))]
    async fn get_full(&self, number: u32) -> CatalogResult<Option<HymnFull>> {
        let raw: RawHymnDetail = self.get_json(&format!("/hinos/{}", number), true).await?;
        Ok(into_full(raw))
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>> {
        let path = format!(
            "/hinos/buscar?q={}&page={}&limit={}",
            urlencoding::encode(query),
            page,
            page_size
        );
        Ok(self.get_optional_page(&path, page, page_size).await?)
    }

    #[instrument(skip(self))]
    async fn get_random(&self) -> CatalogResult<Option<HymnSummary>> {
        let raw: RawHymn = self.get_json("/hinos/aleatorio", false).await?;
        Ok(into_summary(raw))
    }

    #[instrument(skip(self))]
    async fn get_statistics(&self) -> CatalogResult<HymnStatistics> {
        let raw: RawStatistics = self.get_json("/hinos/estatisticas", true).await?;
        Ok(into_statistics(raw))
    }

    #[instrument(skip(self))]
    async fn get_by_author(
        &self,
        author: &str,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>> {
        let path = format!(
            "/hinos/autor/{}?page={}&limit={}",
            urlencoding::encode(author),
            page,
            page_size
        );
        Ok(self.get_optional_page(&path, page, page_size).await?)
    }

    #[instrument(skip(self))]
    async fn get_by_range(
        &self,
        lo: u32,
        hi: u32,
        page: u32,
        page_size: u32,
    ) -> CatalogResult<Page<HymnSummary>> {
        let path = format!("/hinos/faixa/{}/{}?page={}&limit={}", lo, hi, page, page_size);
        Ok(self.get_optional_page(&path, page, page_size).await?)
    }

    /// Builds the listing from the full catalogue; the statistics endpoint
    /// supplies the total when it reports one
    #[instrument(skip(self))]
    async fn list_audio(&self, page: u32, page_size: u32) -> CatalogResult<Page<AudioTrack>> {
        let reported_total = match self.get_statistics().await {
            Ok(stats) => Some(stats.items_with_audio).filter(|n| *n > 0),
            Err(e) => {
                warn!("Statistics unavailable for audio listing: {}", e);
                None
            }
        };

        let catalogue = self.list_hymns(1, AUDIO_SCAN_PAGE_SIZE).await?;
        let tracks: Vec<AudioTrack> = catalogue
            .items
            .iter()
            .filter_map(AudioTrack::from_summary)
            .collect();

        let mut listing = paginate(&tracks, page, page_size);
        if let Some(total) = reported_total {
            listing.total = total;
            listing.total_pages = core_library::pagination::total_pages_for(total, page_size);
        }

        Ok(listing)
    }

    #[instrument(skip(self))]
    async fn audio_for_hymn(&self, number: u32) -> CatalogResult<Option<AudioTrack>> {
        let hymn = self.get_by_number(number).await?;
        Ok(hymn.as_ref().and_then(AudioTrack::from_summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpMethod;
    use bridge_traits::time::FixedClock;
    use bytes::Bytes;
    use core_library::CatalogError;
    use mockall::mock;
    use std::collections::HashMap;
    use std::time::Duration;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn json(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.as_bytes()),
        }
    }

    fn client(mock_http: MockHttpClient) -> HymnApiClient {
        HymnApiClient::new(
            Arc::new(mock_http),
            ApiConfig::default().with_base_url("https://hymns.test"),
            Arc::new(FixedClock::at_millis(1_700_000_000_000)),
        )
    }

    const PAGE_BODY: &str = r#"{
        "hinos": [
            {"number": 1, "title": "Chuvas de Graça", "author": "J. R.", "audioUrl": "https://hymns.test/audio/001.mp3"},
            {"number": 2, "title": "Saudosa Lembrança", "audioUrl": ""}
        ],
        "paginacao": {"pagina": 1, "porPagina": 20, "total": 640, "totalPaginas": 32}
    }"#;

    #[tokio::test]
    async fn test_list_hymns_success() {
        let mut mock_http = MockHttpClient::new();

        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Get);
            assert_eq!(req.url, "https://hymns.test/api/hinos?page=1&limit=20");
            assert_eq!(req.timeout, Some(Duration::from_secs(10)));
            Ok(json(200, PAGE_BODY))
        });

        let page = client(mock_http).list_hymns(1, 20).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 640);
        assert_eq!(page.total_pages, 32);
        assert_eq!(page.items[1].audio_url, None);
    }

    #[tokio::test]
    async fn test_list_hymns_missing_hinos_is_parse_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json(200, r#"{"message": "ok"}"#)));

        let err = client(mock_http).list_hymns(1, 20).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[tokio::test]
    async fn test_search_missing_hinos_is_empty_page() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(
                req.url,
                "https://hymns.test/api/hinos/buscar?q=gra%C3%A7a%20divina&page=1&limit=10"
            );
            Ok(json(200, "{}"))
        });

        let page = client(mock_http).search("graça divina", 1, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retried_with_linear_backoff() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::Timeout("10s".into())));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json(200, PAGE_BODY)));

        let started = tokio::time::Instant::now();
        let page = client(mock_http).list_hymns(1, 20).await.unwrap();

        assert_eq!(page.items.len(), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_exhausts_attempts() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(3)
            .returning(|_| Err(BridgeError::Timeout("10s".into())));

        let err = client(mock_http).get_statistics().await.unwrap_err();
        assert_eq!(err, CatalogError::Timeout { attempts: 3 });
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json(500, "oops")));

        let err = client(mock_http).list_hymns(1, 20).await.unwrap_err();
        assert_eq!(err, CatalogError::Http { status: 500 });
    }

    #[tokio::test]
    async fn test_connection_failure_not_retried() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("Connection failed".into())));

        let err = client(mock_http).get_by_number(1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Transport(_)));
    }

    #[tokio::test]
    async fn test_responses_are_memoized() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json(200, PAGE_BODY)));

        let client = client(mock_http);
        let first = client.list_hymns(1, 20).await.unwrap();
        let second = client.list_hymns(1, 20).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_random_is_never_memoized() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|_| Ok(json(200, r#"{"number": 7, "title": "Seven"}"#)));

        let client = client(mock_http);
        assert_eq!(client.get_random().await.unwrap().unwrap().number, 7);
        assert_eq!(client.get_random().await.unwrap().unwrap().number, 7);
    }

    #[tokio::test]
    async fn test_clear_cache_for_endpoint_forces_refetch() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(2)
            .returning(|_| Ok(json(200, PAGE_BODY)));

        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let client = client(mock_http).with_event_bus(events);

        client.search("paz", 1, 20).await.unwrap();
        assert_eq!(client.clear_cache_for_endpoint("/api/hinos/buscar").await, 1);
        client.search("paz", 1, 20).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            CoreEvent::Catalog(CatalogEvent::CacheCleared {
                prefix: Some("/api/hinos/buscar".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_get_full_derives_lyrics() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/api/hinos/3"));
            Ok(json(
                200,
                r#"{"number": 3, "title": "Three", "verses": [
                    {"sequence": 1, "lyrics": "Alpha", "chorus": false},
                    {"sequence": 2, "lyrics": "Chorus", "chorus": true}
                ]}"#,
            ))
        });

        let full = client(mock_http).get_full(3).await.unwrap().unwrap();
        assert_eq!(full.lyrics, "1. Alpha\n\nChorus");
        assert_eq!(full.chorus, "Chorus");
    }

    #[tokio::test]
    async fn test_get_by_number_without_number_is_none() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json(200, r#"{"message": "not found"}"#)));

        assert_eq!(client(mock_http).get_by_number(9999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_audio_uses_reported_total() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(2).returning(|req| {
            if req.url.ends_with("/estatisticas") {
                Ok(json(
                    200,
                    r#"{"totalHinos": 640, "hinosComAudio": 600, "porcentagemComAudio": 93.75}"#,
                ))
            } else {
                assert!(req.url.ends_with("/api/hinos?page=1&limit=640"));
                Ok(json(200, PAGE_BODY))
            }
        });

        let listing = client(mock_http).list_audio(1, 20).await.unwrap();

        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].filename, "001.mp3");
        assert_eq!(listing.total, 600);
        assert_eq!(listing.total_pages, 30);
    }

    #[tokio::test]
    async fn test_list_audio_survives_statistics_failure() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(2).returning(|req| {
            if req.url.ends_with("/estatisticas") {
                Ok(json(503, ""))
            } else {
                Ok(json(200, PAGE_BODY))
            }
        });

        let listing = client(mock_http).list_audio(1, 20).await.unwrap();
        assert_eq!(listing.total, 1);
        assert_eq!(listing.total_pages, 1);
    }

    #[tokio::test]
    async fn test_search_audio_keeps_search_pagination() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json(200, PAGE_BODY)));

        let listing = client(mock_http).search_audio("graça", 1, 20).await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.total, 640);
    }

    #[tokio::test]
    async fn test_probe_audio() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert_eq!(req.method, HttpMethod::Head);
                assert_eq!(req.timeout, Some(Duration::from_secs(5)));
                Ok(json(200, ""))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::Timeout("5s".into())));

        let client = client(mock_http);
        assert!(client.probe_audio("https://hymns.test/audio/001.mp3").await);
        assert!(!client.probe_audio("https://hymns.test/audio/002.mp3").await);
        assert!(!client.probe_audio("ftp://hymns.test/audio/003.mp3").await);
    }

    #[test]
    fn test_audio_url_helpers() {
        assert!(is_valid_audio_url("https://hymns.test/a.mp3"));
        assert!(is_valid_audio_url("http://hymns.test/a.mp3"));
        assert!(!is_valid_audio_url("file:///tmp/a.mp3"));
        assert!(!is_valid_audio_url("not a url"));

        let client = client(MockHttpClient::new());
        assert_eq!(
            client.audio_file_url("001.mp3"),
            "https://hymns.test/audio/001.mp3"
        );
    }
}
