//! # Sync Orchestrator
//!
//! Materializes the whole remote catalogue into the [`LocalStore`].
//!
//! ## Workflow
//!
//! 1. Fetch page 1 to learn `total_pages` and `total_items`. Failure here
//!    fails the run; local data is left untouched.
//! 2. Fetch pages `2..=total_pages`, pausing `page_delay` before each one.
//!    A page that fails (after the client's own retries) is skipped and its
//!    number recorded.
//! 3. Persist the accumulated list with `save_summaries`.
//! 4. Optionally hydrate full records and persist them with `save_full`.
//! 5. Publish a final progress value with `is_complete = true`, whose
//!    `total_items` is the number of items actually persisted.
//!
//! A run dropped mid-flight (aborted task, runtime shutdown) still closes
//! its progress stream with a complete value in the `Failed` phase.
//!
//! Only one run may be in flight. A second request while syncing observes
//! the in-flight progress instead of starting another pass.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncOrchestrator, SyncStart};
//! use futures::StreamExt;
//!
//! match orchestrator.begin() {
//!     SyncStart::Started(run) => {
//!         let mut progress = run.progress();
//!         tokio::spawn(run.run());
//!         while let Some(p) = progress.next().await {
//!             println!("{}%", p.percent());
//!         }
//!     }
//!     SyncStart::InFlight(progress) => { /* already syncing */ }
//! }
//! ```

use bridge_traits::network::NetworkMonitor;
use bridge_traits::time::Clock;
use core_library::{CacheSnapshot, HymnCatalog, HymnFull, HymnSummary, LocalStore};
use core_runtime::config::SyncSettings;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::job::{SyncJob, SyncJobId, SyncPhase, SyncProgress, SyncStatus};
use crate::{Result, SyncError};

/// Lazy, finite stream of progress values; ends after the complete value
pub type ProgressStream = BoxStream<'static, SyncProgress>;

fn progress_stream(receiver: watch::Receiver<SyncProgress>) -> ProgressStream {
    stream::unfold(Some((receiver, true)), |state| async move {
        let (mut receiver, first) = state?;

        if !first && receiver.changed().await.is_err() {
            return None;
        }

        let progress = receiver.borrow_and_update().clone();
        let next = if progress.is_complete {
            None
        } else {
            Some((receiver, false))
        };

        Some((progress, next))
    })
    .boxed()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of a sync request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// The catalogue was downloaded and persisted
    Synced {
        total_items: u64,
        skipped_pages: Vec<u32>,
    },

    /// The local copy is still within its validity window
    UpToDate { total_items: u64 },

    /// The network is unreachable but local data exists
    OfflineWithLocalData { total_items: u64 },

    /// Another run is already syncing
    InFlight { progress: SyncProgress },

    Failed { message: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncOutcome::Failed { .. })
    }

    pub fn total_items(&self) -> u64 {
        match self {
            SyncOutcome::Synced { total_items, .. }
            | SyncOutcome::UpToDate { total_items }
            | SyncOutcome::OfflineWithLocalData { total_items } => *total_items,
            SyncOutcome::InFlight { progress } => progress.current_items,
            SyncOutcome::Failed { .. } => 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SyncOutcome::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// What [`SyncOrchestrator::begin`] handed out
pub enum SyncStart {
    /// This caller owns the new run and must drive it with [`SyncRun::run`]
    Started(SyncRun),

    /// A run is already in flight; follow it instead
    InFlight(ProgressStream),
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Sync orchestrator
///
/// Cloning is cheap; clones share the single-flight guard.
#[derive(Clone)]
pub struct SyncOrchestrator {
    catalog: Arc<dyn HymnCatalog>,
    store: LocalStore,
    settings: SyncSettings,
    events: EventBus,
    clock: Arc<dyn Clock>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    in_flight: Arc<Mutex<Option<watch::Receiver<SyncProgress>>>>,
    last_job: Arc<Mutex<Option<SyncJob>>>,
}

impl SyncOrchestrator {
    pub fn new(
        catalog: Arc<dyn HymnCatalog>,
        store: LocalStore,
        settings: SyncSettings,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            store,
            settings,
            events,
            clock,
            network_monitor: None,
            in_flight: Arc::new(Mutex::new(None)),
            last_job: Arc::new(Mutex::new(None)),
        }
    }

    /// Consult `monitor` before syncing in [`smart_sync`](Self::smart_sync)
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Claim the single-flight slot
    ///
    /// Returns [`SyncStart::InFlight`] with the running sync's progress when
    /// the slot is taken. The slot is released when the returned
    /// [`SyncRun`] finishes or is dropped.
    pub fn begin(&self) -> SyncStart {
        let mut slot = lock(&self.in_flight);

        if let Some(receiver) = slot.as_ref() {
            debug!("Sync already in flight");
            return SyncStart::InFlight(progress_stream(receiver.clone()));
        }

        let (sender, receiver) = watch::channel(SyncProgress::starting());
        *slot = Some(receiver);

        SyncStart::Started(SyncRun {
            orchestrator: self.clone(),
            job: SyncJob::new(self.clock.now()),
            sender,
        })
    }

    /// Progress of the in-flight run, if any
    pub fn subscribe(&self) -> Option<ProgressStream> {
        lock(&self.in_flight)
            .as_ref()
            .map(|receiver| progress_stream(receiver.clone()))
    }

    /// `Syncing` while a run is in flight, otherwise the last run's status
    pub fn status(&self) -> SyncStatus {
        if lock(&self.in_flight).is_some() {
            return SyncStatus::Syncing;
        }

        lock(&self.last_job)
            .as_ref()
            .map(|job| job.status)
            .unwrap_or(SyncStatus::Idle)
    }

    pub fn last_job(&self) -> Option<SyncJob> {
        lock(&self.last_job).clone()
    }

    /// Download the whole catalogue, or observe the run already in flight
    #[instrument(skip(self))]
    pub async fn full_sync(&self) -> SyncOutcome {
        match self.begin() {
            SyncStart::Started(run) => run.run().await,
            SyncStart::InFlight(_) => {
                let progress = lock(&self.in_flight)
                    .as_ref()
                    .map(|receiver| receiver.borrow().clone())
                    .unwrap_or_default();
                info!(
                    current_page = progress.current_page,
                    total_pages = progress.total_pages,
                    "Sync already in progress"
                );
                SyncOutcome::InFlight { progress }
            }
        }
    }

    /// Always download, ignoring cache validity
    pub async fn force_sync(&self) -> SyncOutcome {
        self.full_sync().await
    }

    pub async fn needs_sync(&self) -> bool {
        !self.store.is_cache_valid().await
    }

    /// Download only when the local copy is stale or missing
    #[instrument(skip(self))]
    pub async fn sync_if_needed(&self) -> SyncOutcome {
        if self.needs_sync().await {
            info!("Local catalogue is stale, syncing");
            return self.full_sync().await;
        }

        let total_items = self.store.stats().await.total_items as u64;
        debug!(total_items, "Local catalogue is fresh");
        SyncOutcome::UpToDate { total_items }
    }

    /// [`sync_if_needed`](Self::sync_if_needed) guarded by a reachability check
    ///
    /// Without a network monitor the check is skipped.
    #[instrument(skip(self))]
    pub async fn smart_sync(&self) -> SyncOutcome {
        if let Some(monitor) = &self.network_monitor {
            if !monitor.is_connected().await {
                let total_items = self.store.stats().await.total_items as u64;

                if total_items > 0 {
                    info!(total_items, "Offline, using local catalogue");
                    return SyncOutcome::OfflineWithLocalData { total_items };
                }

                warn!("Offline with no local catalogue");
                return SyncOutcome::Failed {
                    message: SyncError::Offline.to_string(),
                };
            }
        }

        self.sync_if_needed().await
    }

    pub async fn get_sync_stats(&self) -> CacheSnapshot {
        self.store.snapshot().await
    }

    fn emit(&self, event: SyncEvent) {
        self.events.emit(CoreEvent::Sync(event)).ok();
    }

    fn record_job(&self, job: &SyncJob) {
        *lock(&self.last_job) = Some(job.clone());
    }

    fn release(&self) {
        lock(&self.in_flight).take();
    }
}

// ============================================================================
// Run
// ============================================================================

struct Download {
    persisted: u64,
    reported_total: u64,
    total_pages: u32,
    skipped_pages: Vec<u32>,
}

/// A claimed sync run
///
/// Holds the single-flight slot until it is run to completion or dropped.
pub struct SyncRun {
    orchestrator: SyncOrchestrator,
    job: SyncJob,
    sender: watch::Sender<SyncProgress>,
}

impl SyncRun {
    pub fn job_id(&self) -> SyncJobId {
        self.job.id
    }

    /// Progress of this run; subscribe before calling [`run`](Self::run)
    pub fn progress(&self) -> ProgressStream {
        progress_stream(self.sender.subscribe())
    }

    /// Drive the run to completion
    ///
    /// Never returns an error; failures become [`SyncOutcome::Failed`].
    #[instrument(skip(self), fields(job_id = %self.job.id))]
    pub async fn run(self) -> SyncOutcome {
        let timer = Instant::now();
        let clock = self.orchestrator.clock.clone();

        let job = match self.job.clone().start(clock.now()) {
            Ok(job) => job,
            Err(e) => {
                self.publish_final(SyncPhase::Failed, 0, 0, Vec::new());
                return SyncOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };
        self.orchestrator.record_job(&job);

        info!("Starting catalogue sync");
        self.orchestrator.emit(SyncEvent::Started {
            job_id: job.id.to_string(),
        });

        match self.download(&job).await {
            Ok(download) => {
                match job.complete(
                    download.persisted,
                    download.skipped_pages.clone(),
                    clock.now(),
                ) {
                    Ok(finished) => self.orchestrator.record_job(&finished),
                    Err(e) => warn!("Job bookkeeping failed: {}", e),
                }

                info!(
                    total_items = download.persisted,
                    reported_total = download.reported_total,
                    skipped = download.skipped_pages.len(),
                    "Catalogue sync completed"
                );
                self.orchestrator.emit(SyncEvent::Completed {
                    job_id: self.job.id.to_string(),
                    total_items: download.persisted,
                    skipped_pages: download.skipped_pages.clone(),
                    duration_ms: timer.elapsed().as_millis() as u64,
                });
                self.publish_final(
                    SyncPhase::Completed,
                    download.total_pages,
                    download.persisted,
                    download.skipped_pages.clone(),
                );

                SyncOutcome::Synced {
                    total_items: download.persisted,
                    skipped_pages: download.skipped_pages,
                }
            }
            Err(e) => {
                error!("Catalogue sync failed: {}", e);
                let message = e.to_string();

                match job.fail(message.clone(), clock.now()) {
                    Ok(failed) => self.orchestrator.record_job(&failed),
                    Err(e) => warn!("Job bookkeeping failed: {}", e),
                }
                self.orchestrator.emit(SyncEvent::Failed {
                    job_id: self.job.id.to_string(),
                    message: message.clone(),
                });
                let current = self.sender.borrow().clone();
                self.publish_final(
                    SyncPhase::Failed,
                    current.total_pages,
                    0,
                    current.skipped_pages,
                );

                SyncOutcome::Failed { message }
            }
        }
    }

    async fn download(&self, job: &SyncJob) -> Result<Download> {
        let catalog = &self.orchestrator.catalog;
        let settings = &self.orchestrator.settings;
        let page_size = settings.page_size;

        let first = catalog
            .list_hymns(1, page_size)
            .await
            .map_err(SyncError::FirstPage)?;

        let total_pages = first.total_pages.max(1);
        let reported_total = first.total;
        let mut items: Vec<HymnSummary> = first.items;
        let mut skipped_pages = Vec::new();

        debug!(total_pages, reported_total, "Fetched first page");
        self.publish(job, |p| {
            p.current_page = 1;
            p.total_pages = total_pages;
            p.current_items = items.len() as u64;
            p.total_items = reported_total;
            p.phase = SyncPhase::Fetching;
        });

        for page in 2..=total_pages {
            self.pause().await;

            match catalog.list_hymns(page, page_size).await {
                Ok(fetched) => items.extend(fetched.items),
                Err(e) => {
                    warn!(page, "Skipping catalogue page: {}", e);
                    skipped_pages.push(page);
                }
            }

            let skipped = skipped_pages.clone();
            self.publish(job, |p| {
                p.current_page = page;
                p.current_items = items.len() as u64;
                p.skipped_pages = skipped;
            });
        }

        self.publish(job, |p| p.phase = SyncPhase::Saving);
        self.orchestrator.store.save_summaries(&items).await?;

        if settings.hydrate_full_records {
            self.publish(job, |p| p.phase = SyncPhase::Hydrating);
            self.hydrate(&items).await;
        }

        Ok(Download {
            persisted: items.len() as u64,
            reported_total,
            total_pages,
            skipped_pages,
        })
    }

    /// Fetch and persist full records; failures are logged and skipped
    async fn hydrate(&self, summaries: &[HymnSummary]) {
        let mut full: Vec<HymnFull> = Vec::with_capacity(summaries.len());

        for summary in summaries {
            match self.orchestrator.catalog.get_full(summary.number).await {
                Ok(Some(record)) => full.push(record),
                Ok(None) => debug!(number = summary.number, "No full record"),
                Err(e) => debug!(number = summary.number, "Full record unavailable: {}", e),
            }
        }

        info!(hydrated = full.len(), "Full records fetched");
        if let Err(e) = self.orchestrator.store.save_full(&full).await {
            warn!("Failed to persist full records: {}", e);
        }
    }

    async fn pause(&self) {
        let delay = self.orchestrator.settings.page_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn publish(&self, job: &SyncJob, update: impl FnOnce(&mut SyncProgress)) {
        self.sender.send_modify(update);
        let progress = self.sender.borrow().clone();

        self.orchestrator.emit(SyncEvent::Progress {
            job_id: job.id.to_string(),
            current_page: progress.current_page,
            total_pages: progress.total_pages,
            current_items: progress.current_items,
            total_items: progress.total_items,
            phase: progress.phase.as_str().to_string(),
        });
    }

    fn publish_final(
        &self,
        phase: SyncPhase,
        total_pages: u32,
        items: u64,
        skipped_pages: Vec<u32>,
    ) {
        self.sender.send_modify(|p| {
            p.current_page = total_pages;
            p.total_pages = total_pages;
            p.current_items = items;
            if phase == SyncPhase::Completed {
                p.total_items = items;
            }
            p.is_complete = true;
            p.phase = phase;
            p.skipped_pages = skipped_pages;
        });
    }
}

impl Drop for SyncRun {
    fn drop(&mut self) {
        if !self.sender.borrow().is_complete {
            warn!(job_id = %self.job.id, "Sync run dropped before completion");
            self.sender.send_modify(|p| {
                p.is_complete = true;
                p.phase = SyncPhase::Failed;
            });

            let started = self
                .orchestrator
                .last_job()
                .filter(|job| job.id == self.job.id && job.status.is_active());
            if let Some(job) = started {
                match job.fail("Sync run aborted", self.orchestrator.clock.now()) {
                    Ok(failed) => self.orchestrator.record_job(&failed),
                    Err(e) => warn!("Job bookkeeping failed: {}", e),
                }
            }
        }

        self.orchestrator.release();
    }
}
