mod assets;
mod config;
mod db;
mod error;
mod imagegen;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use assets::pg_store::PgAssetStore;
use assets::{AssetCache, AssetStore, MemoryAssetStore};
use imagegen::ImageGenerator;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AssetConfig::from_env().expect("invalid configuration");

    let store: Arc<dyn AssetStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = db::init_pool(database_url, config.db_max_connections)
                .await
                .expect("database init failed");
            tracing::info!(quota_bytes = config.quota_bytes, "using postgres asset store");
            Arc::new(PgAssetStore::new(pool, config.quota_bytes))
        }
        None => {
            tracing::warn!(quota_bytes = config.quota_bytes, "DATABASE_URL not set; assets kept in memory only");
            Arc::new(MemoryAssetStore::new(config.quota_bytes))
        }
    };

    let cache = AssetCache::new(store, config.cache);

    // Schema and seeding failures leave the cache serving placeholders.
    match cache.ensure_schema().await {
        Ok(outcome) => tracing::info!(?outcome, version = cache.schema_version(), "asset schema checked"),
        Err(e) => tracing::error!(error = %e, "asset schema check failed"),
    }
    if let Err(e) = cache.seed_defaults().await {
        tracing::error!(error = %e, "seeding bundled assets failed");
    }

    // Initialize image generator (non-fatal: upgrades disabled if config missing).
    let generator: Option<Arc<dyn ImageGenerator>> = match imagegen::ImageGenClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "image generator initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "image generator not configured; asset upgrades disabled");
            None
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let control = services::upgrade::UpgradeControl::new(config.upgrade, shutdown_rx);
    let upgrade = generator
        .clone()
        .map(|generator| services::upgrade::spawn_upgrade_task(cache.clone(), generator, control.clone()));

    let state = state::AppState::new(cache, generator, control);
    let app = routes::app(state);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "dcc-assets listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await
        .expect("server failed");

    if let Some(handle) = upgrade {
        match handle.await {
            Ok(report) => tracing::info!(?report, "asset upgrade task stopped"),
            Err(e) => tracing::warn!(error = %e, "asset upgrade task panicked"),
        }
    }
}
