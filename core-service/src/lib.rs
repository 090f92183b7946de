//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, key-value
//! storage, network reachability, clock) into the hymnal core and exposes
//! the resulting [`HymnalService`]. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`]; mobile hosts inject their own bridges through
//! [`CoreConfig::builder`].
//!
//! Reads go through the [`FallbackResolver`], which serves the offline copy
//! whenever the remote catalogue cannot answer.

pub mod error;
pub mod resolver;
pub mod service;

pub use error::{CoreError, Result};
pub use resolver::FallbackResolver;
#[cfg(feature = "desktop-shims")]
pub use service::bootstrap_desktop;
pub use service::HymnalService;

pub use core_library::{
    AudioTrack, CacheSnapshot, HymnFull, HymnStatistics, HymnSummary, Page, Verse,
};
pub use core_runtime::config::{ApiConfig, CoreConfig, FeatureFlags, SyncSettings};
pub use core_runtime::events::{CatalogEvent, CoreEvent, EventStream, SyncEvent};
pub use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use core_sync::{ProgressStream, SyncOutcome, SyncProgress, SyncStatus};
