//! # Hymn Library Module
//!
//! Owns the hymnal domain model and the offline copy of the catalogue.
//!
//! ## Overview
//!
//! This module manages:
//! - Hymn summaries, full records and lyrics derivation
//! - Local pagination matching the remote API
//! - The [`HymnCatalog`] contract implemented by remote providers
//! - The [`LocalStore`] persisted through a host key-value store

pub mod catalog;
pub mod error;
pub mod models;
pub mod pagination;
pub mod store;

pub use catalog::HymnCatalog;
pub use error::{CatalogError, CatalogResult, LibraryError, Result};
pub use models::{
    AudioTrack, CacheSnapshot, CacheStats, HymnFull, HymnStatistics, HymnSummary, Verse,
};
pub use pagination::{paginate, Page};
pub use store::LocalStore;
