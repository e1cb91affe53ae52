//! Asset cache: resolve, store, reset and change notification.
//!
//! DESIGN
//! ======
//! `AssetCache` is the single owned cache instance for the process. It is
//! cheap to clone (an `Arc` inside) and is handed to handlers through
//! `AppState` and to the upgrade daemon by value.
//!
//! Lookup precedence is strict: session overlay, then the stored record,
//! then the deterministic placeholder. The overlay only holds payloads that
//! were accepted by `store` but could not be written durably, so it is empty
//! in the common case.
//!
//! Every successful `store` sends exactly one `AssetEvent::Updated`; `reset`
//! and a schema migration send one `AssetEvent::Reset`. Events carry keys
//! only. Subscribers re-resolve to get the image.
//!
//! ERROR HANDLING
//! ==============
//! `resolve` never fails. Undecodable records and backend read errors are
//! logged and answered with the placeholder. `store` returns
//! `CapacityExceeded` after keeping the payload in the overlay, so the image
//! is still shown for this session and the caller can raise a notice.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{error, info, warn};

use super::datauri::{self, DataUri, DataUriError};
use super::key::{AssetKey, META_PREFIX, Subject};
use super::normalize::{NormalizeError, NormalizeOptions, NormalizedImage, normalize_image};
use super::placeholder;
use super::store::{AssetStore, StoreError, StoreUsage};
use crate::imagegen::GenerationError;

pub const DEFAULT_SCHEMA_VERSION: u32 = 7;
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Meta entry holding the schema version the stored assets were written under.
pub const SCHEMA_VERSION_KEY: &str = "__meta/schema_version";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("image generation unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("asset store is full ({required} bytes needed, quota {quota}); image kept for this session only")]
    CapacityExceeded { required: usize, quota: usize },

    #[error("asset payload could not be decoded: {0}")]
    DecodeFailure(String),

    #[error("asset store error: {0}")]
    Store(String),
}

impl crate::error::ErrorCode for AssetError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::GenerationUnavailable(_) => "E_GENERATION_UNAVAILABLE",
            Self::CapacityExceeded { .. } => "E_CAPACITY_EXCEEDED",
            Self::DecodeFailure(_) => "E_DECODE_FAILURE",
            Self::Store(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<StoreError> for AssetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityExceeded { required, quota } => Self::CapacityExceeded { required, quota },
            StoreError::Database(e) => Self::Store(e.to_string()),
        }
    }
}

impl From<NormalizeError> for AssetError {
    fn from(err: NormalizeError) -> Self {
        Self::DecodeFailure(err.to_string())
    }
}

impl From<DataUriError> for AssetError {
    fn from(err: DataUriError) -> Self {
        Self::DecodeFailure(err.to_string())
    }
}

impl From<GenerationError> for AssetError {
    fn from(err: GenerationError) -> Self {
        Self::GenerationUnavailable(err.to_string())
    }
}

// =============================================================================
// TYPES
// =============================================================================

/// Where a stored asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOrigin {
    Bundled,
    Generated,
}

/// Layer that answered a `resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    Session,
    Generated,
    Bundled,
    Placeholder,
}

impl From<AssetOrigin> for AssetSource {
    fn from(origin: AssetOrigin) -> Self {
        match origin {
            AssetOrigin::Bundled => Self::Bundled,
            AssetOrigin::Generated => Self::Generated,
        }
    }
}

/// Store record. Serialized as JSON into the store value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAsset {
    origin: AssetOrigin,
    payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAsset {
    pub key: String,
    pub payload: String,
    pub source: AssetSource,
}

/// Change notification. Never carries image data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetEvent {
    Updated { key: String },
    Reset,
}

/// One row of the asset library panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryEntry {
    pub key: String,
    pub subject: Subject,
    pub name: &'static str,
    pub source: AssetSource,
    pub size_kb: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SchemaOutcome {
    /// No version was recorded; the current one was written.
    Fresh,
    /// Stored assets were written under the current version.
    Current,
    /// Stored assets were purged. An unreadable old version reports `from: 0`.
    Migrated { from: u32, to: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub normalize: NormalizeOptions,
    pub schema_version: u32,
    pub event_capacity: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            normalize: NormalizeOptions::default(),
            schema_version: DEFAULT_SCHEMA_VERSION,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

// =============================================================================
// CACHE
// =============================================================================

#[derive(Clone)]
pub struct AssetCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: Arc<dyn AssetStore>,
    /// Payloads accepted by `store` but not durably written.
    session: RwLock<HashMap<AssetKey, StoredAsset>>,
    events: broadcast::Sender<AssetEvent>,
    normalize: NormalizeOptions,
    schema_version: u32,
}

impl AssetCache {
    #[must_use]
    pub fn new(store: Arc<dyn AssetStore>, options: CacheOptions) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Self {
            inner: Arc::new(CacheInner {
                store,
                session: RwLock::new(HashMap::new()),
                events,
                normalize: options.normalize,
                schema_version: options.schema_version,
            }),
        }
    }

    #[must_use]
    pub fn normalize_options(&self) -> NormalizeOptions {
        self.inner.normalize
    }

    #[must_use]
    pub fn schema_version(&self) -> u32 {
        self.inner.schema_version
    }

    /// Receive every change made after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AssetEvent> {
        self.inner.events.subscribe()
    }

    /// Best image available for `subject`. Never fails.
    pub async fn resolve(&self, subject: Subject) -> ResolvedAsset {
        let key = subject.key();

        if let Some(entry) = self.inner.session.read().await.get(&key) {
            return ResolvedAsset { key: key.to_string(), payload: entry.payload.clone(), source: AssetSource::Session };
        }

        match self.read_stored(key).await {
            Ok(Some(stored)) => {
                return ResolvedAsset { key: key.to_string(), payload: stored.payload, source: stored.origin.into() };
            }
            Ok(None) => {}
            Err(AssetError::DecodeFailure(e)) => {
                warn!(key = %key, error = %e, "stored asset undecodable; serving placeholder");
            }
            Err(e) => {
                error!(key = %key, error = %e, "asset store read failed; serving placeholder");
            }
        }

        ResolvedAsset { key: key.to_string(), payload: placeholder::placeholder(subject), source: AssetSource::Placeholder }
    }

    /// Store a generated or uploaded image data URI for `subject`.
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if `payload` is not an image data URI (nothing
    /// is written and no event is sent). Returns `CapacityExceeded` or `Store`
    /// if the durable write failed; the payload is then served from the
    /// session overlay and the event is still sent.
    pub async fn store(&self, subject: Subject, payload: String) -> Result<(), AssetError> {
        DataUri::validate(&payload)?;

        let key = subject.key();
        let record = StoredAsset { origin: AssetOrigin::Generated, payload };

        // Held across the durable write so the overlay always matches the
        // last write to finish.
        let mut session = self.inner.session.write().await;
        let result = self.write_record(key, &record).await;
        match &result {
            Ok(()) => {
                session.remove(&key);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "asset not durably stored; keeping it for this session");
                session.insert(key, record);
            }
        }
        drop(session);

        self.notify(AssetEvent::Updated { key: key.to_string() });
        result
    }

    /// Normalize raw image bytes and store the result.
    ///
    /// # Errors
    ///
    /// Returns `DecodeFailure` if the bytes cannot be normalized, otherwise
    /// anything `store` returns.
    pub async fn store_image(&self, subject: Subject, bytes: Vec<u8>) -> Result<NormalizedImage, AssetError> {
        let opts = self.inner.normalize;
        let normalized = tokio::task::spawn_blocking(move || normalize_image(&bytes, opts))
            .await
            .map_err(|e| AssetError::DecodeFailure(format!("normalize task failed: {e}")))??;

        info!(
            subject = subject.slug(),
            width = normalized.width,
            height = normalized.height,
            quality = normalized.quality,
            payload_bytes = normalized.data_uri.len(),
            "image normalized"
        );
        self.store(subject, normalized.data_uri.clone()).await?;
        Ok(normalized)
    }

    /// Restore the bundled default for every subject.
    ///
    /// # Errors
    ///
    /// Returns the first write error. Subjects whose write failed are served
    /// their bundled default from the session overlay.
    pub async fn reset(&self) -> Result<(), AssetError> {
        let mut session = self.inner.session.write().await;
        session.clear();

        let mut first_err = None;
        for subject in Subject::ALL {
            let key = subject.key();
            let record = StoredAsset { origin: AssetOrigin::Bundled, payload: placeholder::bundled(subject) };
            if let Err(e) = self.write_record(key, &record).await {
                warn!(key = %key, error = %e, "bundled default not durably stored");
                session.insert(key, record);
                first_err.get_or_insert(e);
            }
        }
        drop(session);

        info!("asset cache reset to bundled defaults");
        self.notify(AssetEvent::Reset);
        first_err.map_or(Ok(()), Err)
    }

    /// Write the bundled default for every subject without a readable record.
    /// Returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns the first store error; earlier writes are kept.
    pub async fn seed_defaults(&self) -> Result<usize, AssetError> {
        let mut written = 0;
        for subject in Subject::ALL {
            let key = subject.key();
            match self.read_stored(key).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(AssetError::DecodeFailure(e)) => {
                    warn!(key = %key, error = %e, "replacing undecodable asset with bundled default");
                }
                Err(e) => return Err(e),
            }

            let record = StoredAsset { origin: AssetOrigin::Bundled, payload: placeholder::bundled(subject) };
            self.write_record(key, &record).await?;
            self.notify(AssetEvent::Updated { key: key.to_string() });
            written += 1;
        }

        if written > 0 {
            info!(written, "seeded bundled asset defaults");
        }
        Ok(written)
    }

    /// Origin of the image currently served for `subject`, if any.
    pub async fn origin(&self, subject: Subject) -> Option<AssetOrigin> {
        let key = subject.key();
        if let Some(entry) = self.inner.session.read().await.get(&key) {
            return Some(entry.origin);
        }
        self.read_stored(key).await.ok().flatten().map(|s| s.origin)
    }

    /// Asset library listing, in `Subject::ALL` order.
    pub async fn library(&self) -> Vec<LibraryEntry> {
        let mut entries = Vec::with_capacity(Subject::ALL.len());
        for subject in Subject::ALL {
            let resolved = self.resolve(subject).await;
            entries.push(LibraryEntry {
                key: resolved.key,
                subject,
                name: subject.display_name(),
                source: resolved.source,
                size_kb: datauri::approx_size_kb(&resolved.payload),
            });
        }
        entries
    }

    /// Resolved payload of every subject keyed by store key.
    pub async fn export(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for subject in Subject::ALL {
            let resolved = self.resolve(subject).await;
            out.insert(resolved.key, resolved.payload);
        }
        out
    }

    /// # Errors
    ///
    /// Returns `Store` if the backend cannot report usage.
    pub async fn usage(&self) -> Result<StoreUsage, AssetError> {
        Ok(self.inner.store.usage().await?)
    }

    /// Compare the recorded schema version with the configured one and purge
    /// stored assets when they differ.
    ///
    /// # Errors
    ///
    /// Returns any store error hit while reading, purging or recording.
    pub async fn ensure_schema(&self) -> Result<SchemaOutcome, AssetError> {
        let to = self.inner.schema_version;
        let recorded = self.inner.store.get(SCHEMA_VERSION_KEY).await?;

        let outcome = match recorded {
            None => SchemaOutcome::Fresh,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(from) if from == to => return Ok(SchemaOutcome::Current),
                Ok(from) => SchemaOutcome::Migrated { from, to },
                Err(_) => {
                    warn!(recorded = %raw, "unreadable asset schema version");
                    SchemaOutcome::Migrated { from: 0, to }
                }
            },
        };

        if let SchemaOutcome::Migrated { from, .. } = outcome {
            let mut purged = 0usize;
            for key in self.inner.store.keys().await? {
                if key.starts_with(META_PREFIX) {
                    continue;
                }
                if self.inner.store.remove(&key).await? {
                    purged += 1;
                }
            }
            self.inner.session.write().await.clear();
            info!(from, to, purged, "asset schema migrated; stored assets invalidated");
            self.notify(AssetEvent::Reset);
        }

        self.inner.store.put(SCHEMA_VERSION_KEY, &to.to_string()).await?;
        Ok(outcome)
    }

    // =========================================================================
    // internals
    // =========================================================================

    async fn read_stored(&self, key: AssetKey) -> Result<Option<StoredAsset>, AssetError> {
        let Some(raw) = self.inner.store.get(&key.to_string()).await? else {
            return Ok(None);
        };
        let stored: StoredAsset =
            serde_json::from_str(&raw).map_err(|e| AssetError::DecodeFailure(format!("bad record: {e}")))?;
        DataUri::validate(&stored.payload)?;
        Ok(Some(stored))
    }

    async fn write_record(&self, key: AssetKey, record: &StoredAsset) -> Result<(), AssetError> {
        let value = serde_json::to_string(record).map_err(|e| AssetError::Store(e.to_string()))?;
        self.inner.store.put(&key.to_string(), &value).await?;
        Ok(())
    }

    fn notify(&self, event: AssetEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
