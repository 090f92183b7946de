//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `KeyValueStore` using a SQLite-backed key-value table
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient, SqliteKeyValueStore};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let store = SqliteKeyValueStore::open_default().await?;
//!     let network = DesktopNetworkMonitor::new();
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod http;
mod kv_store;
mod network;

pub use http::ReqwestHttpClient;
pub use kv_store::SqliteKeyValueStore;
pub use network::DesktopNetworkMonitor;
