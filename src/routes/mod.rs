//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the asset REST endpoints and the websocket change feed
//! under a single Axum router. Dashboard views resolve images over REST and
//! re-resolve whenever the feed reports a change.

pub mod assets;
pub mod ws;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/assets", get(assets::list_assets))
        .route("/api/assets/export", get(assets::export_assets))
        .route("/api/assets/reset", post(assets::reset_assets))
        .route("/api/assets/regenerate", post(assets::regenerate_assets))
        .route("/api/assets/ws", get(ws::handle_ws))
        .route(
            "/api/assets/{namespace}/{subject}",
            get(assets::get_asset).put(assets::put_asset),
        )
        .route(
            "/api/assets/{namespace}/{subject}/image",
            post(assets::upload_image).layer(DefaultBodyLimit::max(assets::MAX_UPLOAD_BYTES)),
        )
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
