//! # Sync Module
//!
//! Keeps the offline copy of the hymn catalogue up to date.
//!
//! ## Overview
//!
//! This module manages:
//! - Paginated download of the full remote catalogue into the local store
//! - Skip-and-continue handling of pages that fail after client retries
//! - A single-flight guard so only one download runs at a time
//! - Progress reporting as a finite stream and as sync events
//! - Sync policies: forced, when stale, and network-aware
//!
//! ## Components
//!
//! - **Sync Job State Machine** (`job`): `Idle → Syncing → Completed | Failed`
//! - **Sync Orchestrator** (`orchestrator`): runs downloads and applies policies

pub mod error;
pub mod job;
pub mod orchestrator;

pub use error::{Result, SyncError};
pub use job::{SyncJob, SyncJobId, SyncPhase, SyncProgress, SyncStatus};
pub use orchestrator::{ProgressStream, SyncOrchestrator, SyncOutcome, SyncRun, SyncStart};
