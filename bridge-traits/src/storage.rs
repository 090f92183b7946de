//! Key-Value Storage Abstraction
//!
//! Durable string storage that survives app restarts. The hymn cache keeps
//! whole JSON documents under a handful of fixed keys, so the contract is
//! deliberately small: whole-value reads and writes plus transactions for
//! multi-key updates.

use async_trait::async_trait;

use crate::error::Result;

/// Persistent key-value storage trait
///
/// Abstracts platform-specific storage:
/// - iOS: UserDefaults / files in Application Support
/// - Android: SharedPreferences / DataStore
/// - Desktop: SQLite
/// - Web: localStorage / IndexedDB
///
/// Writes overwrite the previous value wholesale; there is no partial or
/// field-level mutation.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::KeyValueStore;
///
/// async fn stamp(store: &dyn KeyValueStore, millis: i64) -> Result<()> {
///     store.set_string("last-sync-time", &millis.to_string()).await
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a string value, replacing any previous value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a key exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all keys, sorted
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Begin a transaction for atomic multi-key updates
    ///
    /// Nothing is visible to readers until [`KeyValueTransaction::commit`].
    /// Dropping the transaction without committing discards it.
    async fn begin_transaction(&self) -> Result<Box<dyn KeyValueTransaction>>;
}

/// Transaction for atomic key-value updates
#[async_trait]
pub trait KeyValueTransaction: Send {
    /// Set a value within the transaction
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete a value within the transaction
    async fn delete(&mut self, key: &str) -> Result<()>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}
