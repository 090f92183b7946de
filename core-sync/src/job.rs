//! # Sync Job State Machine
//!
//! Tracks one catalogue download with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Syncing → Completed
//!          ↓
//!        Failed
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncJob, SyncStatus};
//!
//! let job = SyncJob::new(clock.now());
//! let job = job.start(clock.now())?;
//! let job = job.complete(640, vec![], clock.now())?;
//! assert_eq!(job.status, SyncStatus::Completed);
//! ```

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SyncJobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Job has been created but not yet started
    Idle,
    /// Pages are being fetched or persisted
    Syncing,
    /// The catalogue was persisted locally
    Completed,
    /// The run aborted without touching local data
    Failed,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(SyncStatus::Idle),
            "syncing" => Ok(SyncStatus::Syncing),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Progress Types
// ============================================================================

/// Stage of a running sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Starting,
    Fetching,
    Saving,
    Hydrating,
    Completed,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Starting => "starting",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Saving => "saving",
            SyncPhase::Hydrating => "hydrating",
            SyncPhase::Completed => "completed",
            SyncPhase::Failed => "failed",
        }
    }
}

/// Snapshot of a running sync, as published on the progress stream
///
/// The last value of every run has `is_complete == true`, whether the run
/// succeeded or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub current_page: u32,
    pub total_pages: u32,
    /// Items accumulated so far
    pub current_items: u64,
    /// Items the server reported on the first page
    pub total_items: u64,
    pub is_complete: bool,
    pub phase: SyncPhase,
    /// Pages that failed and were left out of the accumulated list
    pub skipped_pages: Vec<u32>,
}

impl SyncProgress {
    pub fn starting() -> Self {
        Self {
            current_page: 0,
            total_pages: 0,
            current_items: 0,
            total_items: 0,
            is_complete: false,
            phase: SyncPhase::Starting,
            skipped_pages: Vec::new(),
        }
    }

    /// Progress percentage (0-100) by pages
    pub fn percent(&self) -> u8 {
        if self.is_complete {
            return 100;
        }
        if self.total_pages == 0 {
            return 0;
        }
        ((self.current_page as f64 / self.total_pages as f64) * 100.0).min(100.0) as u8
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::starting()
    }
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// A sync job with state machine semantics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub status: SyncStatus,
    /// Items persisted (only set when completed)
    pub total_items: Option<u64>,
    pub skipped_pages: Vec<u32>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    /// Create a new sync job in idle state
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: SyncJobId::new(),
            status: SyncStatus::Idle,
            total_items: None,
            skipped_pages: Vec::new(),
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the job is not idle
    pub fn start(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncStatus::Syncing)?;
        self.status = SyncStatus::Syncing;
        self.started_at = Some(now);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error if the job is not syncing
    pub fn complete(
        mut self,
        total_items: u64,
        skipped_pages: Vec<u32>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        self.validate_transition(SyncStatus::Completed)?;
        self.status = SyncStatus::Completed;
        self.total_items = Some(total_items);
        self.skipped_pages = skipped_pages;
        self.completed_at = Some(now);
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error if the job already finished
    pub fn fail(mut self, error_message: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncStatus::Failed)?;
        self.status = SyncStatus::Failed;
        self.error_message = Some(error_message.into());
        self.completed_at = Some(now);
        Ok(self)
    }

    /// Returns None if the job hasn't started or finished yet
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }

    fn validate_transition(&self, to: SyncStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SyncStatus::Idle, SyncStatus::Syncing)
                | (SyncStatus::Idle, SyncStatus::Failed)
                | (SyncStatus::Syncing, SyncStatus::Completed)
                | (SyncStatus::Syncing, SyncStatus::Failed)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
