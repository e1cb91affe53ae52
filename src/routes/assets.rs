//! Asset REST routes.
//!
//! ERROR HANDLING
//! ==============
//! Failures render as `ErrorBody` JSON. A write that only reached the session
//! overlay (`CapacityExceeded`) is not an HTTP error: it answers 200 with
//! `durable: false` and a warning for the dashboard's storage-full banner.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::{ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::assets::cache::LibraryEntry;
use crate::assets::{AssetError, ResolvedAsset, StoreUsage, Subject};
use crate::error::{ErrorBody, ErrorCode};
use crate::services::upgrade;
use crate::state::AppState;

/// Largest raw upload accepted by the image route.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("unknown asset subject '{namespace}/{subject}'")]
    UnknownSubject { namespace: String, subject: String },
    #[error("asset regeneration already running")]
    RegenerationRunning,
    #[error(transparent)]
    Asset(#[from] AssetError),
}

impl ErrorCode for RouteError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSubject { .. } => "E_UNKNOWN_SUBJECT",
            Self::RegenerationRunning => "E_REGENERATION_RUNNING",
            Self::Asset(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::UnknownSubject { .. } => false,
            Self::RegenerationRunning => true,
            Self::Asset(e) => e.retryable(),
        }
    }
}

pub(crate) fn route_error_status(err: &RouteError) -> StatusCode {
    match err {
        RouteError::UnknownSubject { .. } => StatusCode::NOT_FOUND,
        RouteError::RegenerationRunning => StatusCode::CONFLICT,
        RouteError::Asset(AssetError::DecodeFailure(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        RouteError::Asset(AssetError::GenerationUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        RouteError::Asset(AssetError::CapacityExceeded { .. }) => StatusCode::INSUFFICIENT_STORAGE,
        RouteError::Asset(AssetError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        (route_error_status(&self), Json(ErrorBody::from_error(&self))).into_response()
    }
}

fn parse_subject(namespace: &str, subject: &str) -> Result<Subject, RouteError> {
    Subject::parse(namespace, subject).ok_or_else(|| RouteError::UnknownSubject {
        namespace: namespace.to_string(),
        subject: subject.to_string(),
    })
}

// =============================================================================
// BODIES
// =============================================================================

#[derive(Serialize)]
pub struct LibraryResponse {
    pub assets: Vec<LibraryEntry>,
    /// `None` when the store could not report usage.
    pub usage: Option<StoreUsage>,
}

#[derive(Deserialize)]
pub struct PutAssetBody {
    pub payload: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WriteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub durable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Fold a cache write result into a response body. Only a capacity failure
/// is downgraded to a warning.
pub(crate) fn write_outcome(key: Option<String>, result: Result<(), AssetError>) -> Result<WriteResponse, RouteError> {
    match result {
        Ok(()) => Ok(WriteResponse { key, durable: true, warning: None }),
        Err(e @ AssetError::CapacityExceeded { .. }) => Ok(WriteResponse { key, durable: false, warning: Some(e.to_string()) }),
        Err(e) => Err(e.into()),
    }
}

/// Quoted hex SHA-256 of the payload.
pub(crate) fn etag_for(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let hex = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect::<String>();
    format!("\"{hex}\"")
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/assets`: asset library listing and store usage.
pub async fn list_assets(State(state): State<AppState>) -> Json<LibraryResponse> {
    let assets = state.cache.library().await;
    let usage = match state.cache.usage().await {
        Ok(usage) => Some(usage),
        Err(e) => {
            warn!(error = %e, "asset store usage unavailable");
            None
        }
    };
    Json(LibraryResponse { assets, usage })
}

/// `GET /api/assets/export`: key to payload map of every resolved asset.
pub async fn export_assets(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    Json(state.cache.export().await)
}

/// `GET /api/assets/:namespace/:subject`: resolved asset with an `ETag`.
pub async fn get_asset(
    State(state): State<AppState>,
    Path((namespace, subject)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, RouteError> {
    let subject = parse_subject(&namespace, &subject)?;
    let resolved: ResolvedAsset = state.cache.resolve(subject).await;
    let etag = etag_for(&resolved.payload);

    if headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == etag)
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let mut response = Json(resolved).into_response();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response.headers_mut().insert(ETAG, value);
    }
    Ok(response)
}

/// `PUT /api/assets/:namespace/:subject`: store an image data URI.
pub async fn put_asset(
    State(state): State<AppState>,
    Path((namespace, subject)): Path<(String, String)>,
    Json(body): Json<PutAssetBody>,
) -> Result<Json<WriteResponse>, RouteError> {
    let subject = parse_subject(&namespace, &subject)?;
    let result = state.cache.store(subject, body.payload).await;
    Ok(Json(write_outcome(Some(subject.key().to_string()), result)?))
}

/// `POST /api/assets/:namespace/:subject/image`: normalize raw bytes, then store.
pub async fn upload_image(
    State(state): State<AppState>,
    Path((namespace, subject)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<WriteResponse>, RouteError> {
    let subject = parse_subject(&namespace, &subject)?;
    let result = state.cache.store_image(subject, body.to_vec()).await.map(|_| ());
    Ok(Json(write_outcome(Some(subject.key().to_string()), result)?))
}

/// `POST /api/assets/reset`: restore the bundled default set.
pub async fn reset_assets(State(state): State<AppState>) -> Result<Json<WriteResponse>, RouteError> {
    let result = state.cache.reset().await;
    Ok(Json(write_outcome(None, result)?))
}

/// `POST /api/assets/regenerate`: regenerate every subject in the background.
/// Refused with 409 while the boot pass or another regeneration is running.
pub async fn regenerate_assets(State(state): State<AppState>) -> Result<Response, RouteError> {
    let Some(generator) = state.generator.clone() else {
        return Err(AssetError::GenerationUnavailable("no image generator configured".into()).into());
    };

    if upgrade::spawn_regeneration(state.cache.clone(), generator, &state.upgrade).is_none() {
        warn!("asset regeneration refused; a pass is already running");
        return Err(RouteError::RegenerationRunning);
    }
    info!("asset regeneration started");

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "accepted": true }))).into_response())
}

#[cfg(test)]
#[path = "assets_test.rs"]
mod tests;
