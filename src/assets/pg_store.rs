//! Postgres-backed asset store.
//!
//! ERROR HANDLING
//! ==============
//! The quota check and the upsert run in one transaction under an advisory
//! lock, so two concurrent writers cannot both slip under the ceiling.

use sqlx::PgPool;

use super::store::{AssetStore, StoreError, StoreUsage, entry_size};

/// Advisory lock id serializing quota checks on `asset_cache`.
const ASSET_CACHE_LOCK_ID: i64 = 0x0DCC_A55E;

pub struct PgAssetStore {
    pool: PgPool,
    quota: usize,
}

impl PgAssetStore {
    #[must_use]
    pub fn new(pool: PgPool, quota: usize) -> Self {
        Self { pool, quota }
    }
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

#[async_trait::async_trait]
impl AssetStore for PgAssetStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM asset_cache WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ASSET_CACHE_LOCK_ID)
            .execute(tx.as_mut())
            .await?;

        let others: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(octet_length(key) + octet_length(value)), 0)::BIGINT
             FROM asset_cache WHERE key <> $1",
        )
        .bind(key)
        .fetch_one(tx.as_mut())
        .await?;

        let required = to_usize(others) + entry_size(key, value);
        if required > self.quota {
            // Dropping `tx` rolls back and releases the lock.
            return Err(StoreError::CapacityExceeded { required, quota: self.quota });
        }

        sqlx::query(
            "INSERT INTO asset_cache (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM asset_cache WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let keys = sqlx::query_scalar::<_, String>("SELECT key FROM asset_cache")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    async fn usage(&self) -> Result<StoreUsage, StoreError> {
        let used: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(octet_length(key) + octet_length(value)), 0)::BIGINT FROM asset_cache",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(StoreUsage { used_bytes: to_usize(used), quota_bytes: self.quota })
    }
}
