//! Assets: the dashboard's machine and part visuals.
//!
//! DESIGN
//! ======
//! `key` names what can be cached, `store`/`pg_store` persist it under a
//! hard quota, `normalize` shrinks generated rasters before they are stored,
//! and `cache` ties these together behind `resolve`/`store`/`reset` with a
//! broadcast change feed. `placeholder` provides the two local fallbacks:
//! the synthesized placeholder and the bundled default set.

pub mod cache;
pub mod datauri;
pub mod key;
pub mod normalize;
pub mod pg_store;
pub mod placeholder;
pub mod store;

pub use cache::{AssetCache, AssetError, AssetEvent, AssetOrigin, AssetSource, CacheOptions, ResolvedAsset, SchemaOutcome};
pub use key::{AssetKey, ProcessType, ProductType, Subject};
pub use store::{AssetStore, MemoryAssetStore, StoreError, StoreUsage};
