//! Service configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Tuning knobs fall back to their documented defaults when unset. A value
//! that is set but malformed or out of range is a startup error, not a
//! silent default.

use crate::assets::cache::{CacheOptions, DEFAULT_EVENT_CAPACITY, DEFAULT_SCHEMA_VERSION};
use crate::assets::normalize::{
    DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, MIN_MAX_PAYLOAD_BYTES, NormalizeOptions,
};
use crate::assets::store::DEFAULT_QUOTA_BYTES;
use crate::db::DEFAULT_DB_MAX_CONNECTIONS;
use crate::services::upgrade::{DEFAULT_UPGRADE_PACING_MS, DEFAULT_UPGRADE_START_DELAY_MS, UpgradeConfig};

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not valid: '{value}'")]
    Invalid { key: String, value: String },
    #[error("{key} must be {expected}, got {value}")]
    OutOfRange { key: String, value: String, expected: &'static str },
}

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub port: u16,
    pub database_url: Option<String>,
    /// Pool size for the Postgres store.
    pub db_max_connections: u32,
    pub quota_bytes: usize,
    pub cache: CacheOptions,
    pub upgrade: UpgradeConfig,
}

impl AssetConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a value that does not parse and `OutOfRange` for
    /// a zero width, quota, pool size or event capacity, a JPEG quality outside 1-100, or
    /// a payload ceiling below `MIN_MAX_PAYLOAD_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let quality: u8 = env_parse("ASSET_JPEG_QUALITY", DEFAULT_QUALITY)?;
        if !(1..=100).contains(&quality) {
            return Err(out_of_range("ASSET_JPEG_QUALITY", quality, "between 1 and 100"));
        }
        let max_width: u32 = env_parse("ASSET_MAX_WIDTH", DEFAULT_MAX_WIDTH)?;
        if max_width == 0 {
            return Err(out_of_range("ASSET_MAX_WIDTH", max_width, "at least 1"));
        }
        let quota_bytes: usize = env_parse("ASSET_STORE_QUOTA_BYTES", DEFAULT_QUOTA_BYTES)?;
        if quota_bytes == 0 {
            return Err(out_of_range("ASSET_STORE_QUOTA_BYTES", quota_bytes, "at least 1"));
        }
        let db_max_connections: u32 = env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        if db_max_connections == 0 {
            return Err(out_of_range("DB_MAX_CONNECTIONS", db_max_connections, "at least 1"));
        }
        let event_capacity: usize = env_parse("ASSET_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY)?;
        if event_capacity == 0 {
            return Err(out_of_range("ASSET_EVENT_CAPACITY", event_capacity, "at least 1"));
        }
        let max_payload_bytes: usize = env_parse("ASSET_MAX_PAYLOAD_BYTES", DEFAULT_MAX_PAYLOAD_BYTES)?;
        if max_payload_bytes < MIN_MAX_PAYLOAD_BYTES {
            return Err(out_of_range("ASSET_MAX_PAYLOAD_BYTES", max_payload_bytes, "at least 1024"));
        }
        if max_payload_bytes > quota_bytes {
            tracing::warn!(
                max_payload_bytes,
                quota_bytes,
                "ASSET_MAX_PAYLOAD_BYTES exceeds the store quota; large images will only be kept for the session"
            );
        }

        let normalize = NormalizeOptions { max_width, quality, max_payload_bytes };
        let cache = CacheOptions {
            normalize,
            schema_version: env_parse("ASSET_SCHEMA_VERSION", DEFAULT_SCHEMA_VERSION)?,
            event_capacity,
        };
        let upgrade = UpgradeConfig {
            enabled: env_parse("ASSET_UPGRADE_ENABLED", true)?,
            start_delay_ms: env_parse("ASSET_UPGRADE_START_DELAY_MS", DEFAULT_UPGRADE_START_DELAY_MS)?,
            pacing_ms: env_parse("ASSET_UPGRADE_PACING_MS", DEFAULT_UPGRADE_PACING_MS)?,
        };

        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT)?,
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            db_max_connections,
            quota_bytes,
            cache,
            upgrade,
        })
    }
}

/// Parse `key` from the environment, or return `default` when it is unset.
///
/// # Errors
///
/// Returns `Invalid` when the variable is set but does not parse.
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key: key.to_string(), value: raw }),
    }
}

fn out_of_range(key: &str, value: impl ToString, expected: &'static str) -> ConfigError {
    ConfigError::OutOfRange { key: key.to_string(), value: value.to_string(), expected }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
