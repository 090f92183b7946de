//! # Core Configuration Module
//!
//! Provides configuration management for the hymnal core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings. It enforces
//! fail-fast validation so misconfiguration surfaces at startup rather than on
//! the first remote call.
//!
//! ## Required Dependencies
//!
//! - `KeyValueStore` - Durable storage for the offline hymn cache
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Remote API access (desktop default: reqwest)
//! - `NetworkMonitor` - Connectivity detection (desktop default: TCP probe)
//! - `Clock` - Time source (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{ApiConfig, CoreConfig, SyncSettings};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .key_value_store(Arc::new(store))
//!     .api(ApiConfig::default().with_base_url("https://hymns.example.org"))
//!     .sync(SyncSettings::default().with_page_size(50))
//!     .enable_network_awareness(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No key-value store was injected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, KeyValueStore, NetworkMonitor, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Public hymn API deployment
pub const DEFAULT_BASE_URL: &str = "https://api-harpa-crista-uzgo.vercel.app";

/// Upper bound on the sync page size accepted by the remote API.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Remote content API settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme and host, without a trailing slash
    pub base_url: String,

    /// Path prefix prepended to every catalogue endpoint
    pub api_prefix: String,

    /// Deadline for catalogue requests
    pub request_timeout: Duration,

    /// Deadline for audio availability probes
    pub audio_probe_timeout: Duration,

    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Base delay between attempts; multiplied by the attempt number
    pub retry_delay: Duration,

    /// How long a memoized response stays fresh
    pub response_cache_ttl: Duration,

    /// Maximum number of memoized responses
    pub response_cache_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: "/api".to_string(),
            request_timeout: Duration::from_secs(10),
            audio_probe_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            response_cache_ttl: Duration::from_secs(5 * 60),
            response_cache_capacity: 256,
        }
    }
}

impl ApiConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_audio_probe_timeout(mut self, timeout: Duration) -> Self {
        self.audio_probe_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_response_cache_ttl(mut self, ttl: Duration) -> Self {
        self.response_cache_ttl = ttl;
        self
    }

    pub fn with_response_cache_capacity(mut self, capacity: usize) -> Self {
        self.response_cache_capacity = capacity;
        self
    }

    /// Full URL for an API path such as `/hinos/12`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "API base URL must use http or https: {}",
                self.base_url
            )));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(Error::Config(
                "API prefix must be empty or start with '/'".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.audio_probe_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeouts must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(Error::Config(
                "At least one request attempt is required".to_string(),
            ));
        }

        if self.response_cache_capacity == 0 {
            return Err(Error::Config(
                "Response cache capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Full-catalogue synchronization settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Records requested per page during a full sync
    pub page_size: u32,

    /// Pause between consecutive page fetches
    pub page_delay: Duration,

    /// How long a completed sync keeps the local cache valid
    pub cache_validity: Duration,

    /// Also fetch and persist every full record after summaries are saved
    pub hydrate_full_records: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            page_delay: Duration::from_millis(100),
            cache_validity: Duration::from_secs(24 * 60 * 60),
            hydrate_full_records: false,
        }
    }
}

impl SyncSettings {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_cache_validity(mut self, validity: Duration) -> Self {
        self.cache_validity = validity;
        self
    }

    pub fn with_hydrate_full_records(mut self, enabled: bool) -> Self {
        self.hydrate_full_records = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config(
                "Sync page size must be greater than 0".to_string(),
            ));
        }

        if self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Sync page size exceeds maximum of {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.cache_validity.is_zero() {
            return Err(Error::Config(
                "Cache validity window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Feature flags for optional behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Consult the network monitor before syncing
    pub enable_network_awareness: bool,

    /// Run `sync_if_needed` in the background when the service starts
    pub sync_on_startup: bool,
}

/// Core configuration
///
/// Holds all bridge implementations and settings required to construct the
/// hymnal service.
#[derive(Clone)]
pub struct CoreConfig {
    pub api: ApiConfig,

    pub sync: SyncSettings,

    pub http_client: Arc<dyn HttpClient>,

    pub key_value_store: Arc<dyn KeyValueStore>,

    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    pub clock: Arc<dyn Clock>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api", &self.api)
            .field("sync", &self.sync)
            .field("http_client", &"HttpClient { ... }")
            .field("key_value_store", &"KeyValueStore { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// Called automatically by [`CoreConfigBuilder::build`].
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.sync.validate()?;

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn key_value_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "KeyValueStore".to_string(),
        message: "KeyValueStore implementation is required for the offline hymn cache. \
                 Desktop: open bridge_desktop::SqliteKeyValueStore and inject it. \
                 Mobile: inject platform-native storage (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the hymn API. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack (URLSession/OkHttp)."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    use bridge_desktop::DesktopNetworkMonitor;

    Some(Arc::new(DesktopNetworkMonitor::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    None
}

/// Builder for CoreConfig
#[derive(Default)]
pub struct CoreConfigBuilder {
    api: Option<ApiConfig>,
    sync: Option<SyncSettings>,
    http_client: Option<Arc<dyn HttpClient>>,
    key_value_store: Option<Arc<dyn KeyValueStore>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.api = Some(api);
        self
    }

    /// Shorthand for overriding only the API base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        let api = self.api.take().unwrap_or_default();
        self.api = Some(api.with_base_url(base_url));
        self
    }

    pub fn sync(mut self, sync: SyncSettings) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn key_value_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.key_value_store = Some(store);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    pub fn sync_on_startup(mut self, enabled: bool) -> Self {
        self.features.sync_on_startup = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No `KeyValueStore` was provided
    /// - No `HttpClient` was provided and no platform default exists
    /// - Any setting fails validation
    pub fn build(self) -> Result<CoreConfig> {
        let key_value_store = self
            .key_value_store
            .ok_or_else(key_value_store_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let network_monitor = self
            .network_monitor
            .or_else(provide_default_network_monitor);

        let config = CoreConfig {
            api: self.api.unwrap_or_default(),
            sync: self.sync.unwrap_or_default(),
            http_client,
            key_value_store,
            network_monitor,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
