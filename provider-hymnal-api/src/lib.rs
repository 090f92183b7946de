//! # Hymn API Provider
//!
//! Implements the `HymnCatalog` trait for the public hymnal REST API.
//!
//! ## Overview
//!
//! This module provides:
//! - Typed access to the listing, lookup, search, author and range endpoints
//! - Timeout-only retry with linear backoff
//! - Normalization of the server's inconsistent pagination shapes
//! - A short-lived response cache with prefix invalidation
//! - Audio listings and availability probes

pub mod cache;
pub mod connector;
pub mod error;
pub mod normalize;
pub mod types;

pub use cache::ResponseCache;
pub use connector::{is_valid_audio_url, HymnApiClient, AUDIO_SCAN_PAGE_SIZE};
pub use error::{HymnApiError, Result};
pub use normalize::normalize_page;
