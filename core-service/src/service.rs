//! Composition root wiring the catalogue client, local store, orchestrator
//! and fallback resolver over one shared event bus.

use std::sync::Arc;

use core_library::{HymnCatalog, LocalStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_sync::{SyncOrchestrator, SyncOutcome};
use provider_hymnal_api::HymnApiClient;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;
use crate::resolver::FallbackResolver;

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones share the client, store and event bus.
#[derive(Clone)]
pub struct HymnalService {
    config: Arc<CoreConfig>,
    events: EventBus,
    client: Arc<HymnApiClient>,
    store: LocalStore,
    orchestrator: SyncOrchestrator,
    resolver: FallbackResolver,
}

impl HymnalService {
    /// Wire the core from a validated configuration
    ///
    /// The network monitor is only handed to the orchestrator and the
    /// resolver when network awareness is enabled in the feature flags.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::default();

        let client = Arc::new(
            HymnApiClient::new(
                config.http_client.clone(),
                config.api.clone(),
                config.clock.clone(),
            )
            .with_event_bus(events.clone()),
        );
        let catalog: Arc<dyn HymnCatalog> = client.clone();

        let store = LocalStore::new(config.key_value_store.clone(), config.clock.clone())
            .with_cache_validity(config.sync.cache_validity);

        let mut orchestrator = SyncOrchestrator::new(
            catalog.clone(),
            store.clone(),
            config.sync.clone(),
            events.clone(),
            config.clock.clone(),
        );

        let mut resolver = FallbackResolver::new(catalog, store.clone(), events.clone());

        if config.features.enable_network_awareness {
            if let Some(monitor) = &config.network_monitor {
                orchestrator = orchestrator.with_network_monitor(monitor.clone());
                resolver = resolver.with_network_monitor(monitor.clone());
            }
        }

        info!(base_url = %config.api.base_url, "Hymnal service initialized");

        Ok(Self {
            config: Arc::new(config),
            events,
            client,
            store,
            orchestrator,
            resolver,
        })
    }

    /// Kick off a background `smart_sync` when `sync_on_startup` is set
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Option<JoinHandle<SyncOutcome>> {
        if !self.config.features.sync_on_startup {
            debug!("Startup sync disabled");
            return None;
        }

        let orchestrator = self.orchestrator.clone();
        Some(tokio::spawn(async move { orchestrator.smart_sync().await }))
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn client(&self) -> &Arc<HymnApiClient> {
        &self.client
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Stream of every sync and catalogue event emitted from now on
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }
}

/// Build a service over the desktop SQLite store with default settings
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<HymnalService> {
    use crate::error::CoreError;
    use bridge_desktop::SqliteKeyValueStore;

    let kv = SqliteKeyValueStore::open_default()
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let config = CoreConfig::builder().key_value_store(Arc::new(kv)).build()?;

    HymnalService::new(config)
}
