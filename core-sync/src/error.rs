use core_library::{CatalogError, LibraryError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Without the first page there is nothing to accumulate
    #[error("Failed to fetch the first catalogue page: {0}")]
    FirstPage(#[source] CatalogError),

    #[error("Failed to persist catalogue: {0}")]
    Storage(#[from] LibraryError),

    #[error("Network unavailable and no local data")]
    Offline,

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
