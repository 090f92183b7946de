//! Error types for the hymn API provider

use bridge_traits::error::BridgeError;
use core_library::CatalogError;
use thiserror::Error;

/// Hymn API provider errors
#[derive(Error, Debug)]
pub enum HymnApiError {
    /// Every attempt exceeded the request deadline
    #[error("Request to {endpoint} timed out after {attempts} attempt(s)")]
    Timeout { endpoint: String, attempts: u32 },

    /// API request returned a non-success status
    #[error("Hymn API error (status {status_code}) for {endpoint}")]
    ApiError { status_code: u16, endpoint: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Network error other than a timeout
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Result type for hymn API operations
pub type Result<T> = std::result::Result<T, HymnApiError>;

impl HymnApiError {
    /// Classify a single failed attempt from the HTTP bridge
    pub(crate) fn from_bridge(endpoint: &str, error: BridgeError, attempts: u32) -> Self {
        match error {
            BridgeError::Timeout(_) => HymnApiError::Timeout {
                endpoint: endpoint.to_string(),
                attempts,
            },
            other => HymnApiError::NetworkError(other.to_string()),
        }
    }
}

impl From<HymnApiError> for CatalogError {
    fn from(error: HymnApiError) -> Self {
        match error {
            HymnApiError::Timeout { attempts, .. } => CatalogError::Timeout { attempts },
            HymnApiError::ApiError { status_code, .. } => CatalogError::Http {
                status: status_code,
            },
            HymnApiError::ParseError(msg) => CatalogError::Parse(msg),
            HymnApiError::NetworkError(msg) => CatalogError::Transport(msg),
        }
    }
}
