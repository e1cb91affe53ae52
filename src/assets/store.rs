//! Asset store: capacity-bounded string key/value persistence.
//!
//! DESIGN
//! ======
//! The cache talks to persistence only through `AssetStore`, which gives
//! whole-value replace semantics (a reader never sees a partial write) and
//! last-write-wins between writers. Every backend enforces a hard quota on
//! `len(key) + len(value)` summed over all entries; a `put` that would cross
//! it fails with `CapacityExceeded` and leaves the previous value in place.
//!
//! `MemoryAssetStore` backs tests and deployments without `DATABASE_URL`.
//! `PgAssetStore` (see `pg_store.rs`) backs durable deployments.

use std::collections::HashMap;
use std::sync::Mutex;

pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store quota exceeded: write needs {required} bytes, quota is {quota}")]
    CapacityExceeded { required: usize, quota: usize },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::CapacityExceeded { .. } => "E_CAPACITY_EXCEEDED",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Bytes in use versus the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StoreUsage {
    pub used_bytes: usize,
    pub quota_bytes: usize,
}

/// Size an entry counts against the quota.
#[must_use]
pub fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

/// Persistent string key/value store with a hard capacity ceiling.
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the read fails.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write or overwrite `key`.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` if the write would exceed the quota, or a
    /// backend error.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the delete fails.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// All keys currently stored, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the scan fails.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Current usage against the quota.
    ///
    /// # Errors
    ///
    /// Returns a backend error if usage cannot be computed.
    async fn usage(&self) -> Result<StoreUsage, StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-process store. Contents live as long as the process.
pub struct MemoryAssetStore {
    entries: Mutex<HashMap<String, String>>,
    quota: usize,
}

impl MemoryAssetStore {
    #[must_use]
    pub fn new(quota: usize) -> Self {
        Self { entries: Mutex::new(HashMap::new()), quota }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_BYTES)
    }
}

#[async_trait::async_trait]
impl AssetStore for MemoryAssetStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let others: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum();
        let required = others + entry_size(key, value);
        if required > self.quota {
            return Err(StoreError::CapacityExceeded { required, quota: self.quota });
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn usage(&self) -> Result<StoreUsage, StoreError> {
        let used_bytes = self.lock().iter().map(|(k, v)| entry_size(k, v)).sum();
        Ok(StoreUsage { used_bytes, quota_bytes: self.quota })
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
