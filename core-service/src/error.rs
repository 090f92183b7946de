use core_library::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    /// The remote call failed and no local data could stand in for it
    #[error("{operation} unavailable: {source}")]
    Unavailable {
        operation: String,
        #[source]
        source: CatalogError,
    },

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

impl CoreError {
    pub(crate) fn unavailable(operation: &str, source: CatalogError) -> Self {
        CoreError::Unavailable {
            operation: operation.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
