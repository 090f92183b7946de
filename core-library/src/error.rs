use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors raised by the local hymn store
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;

/// Error returned across the [`HymnCatalog`](crate::catalog::HymnCatalog) boundary
///
/// Providers convert their internal errors into this type so the sync and
/// fallback layers never depend on a concrete client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Every attempt hit the request deadline
    #[error("Request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// The server answered with a non-success status
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Parse(String),

    /// Connection-level failure before any response arrived
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CatalogError {
    /// Whether the failure is network-related rather than structural
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Timeout { .. } | CatalogError::Transport(_))
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
