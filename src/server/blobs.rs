//! Preflight and blob upload handlers

use super::{ApiError, AppState};
use crate::api::{BlobStatus, CreateBlobResponse, PreflightRequest, PreflightResponse};
use crate::blobstore::UploadOutcome;
use crate::hash::validate_hash;
use crate::manifest::validate_bundle_path;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

/// `POST /bundles/preflight`: report which of the listed hashes are not
/// yet published, in first-appearance order with duplicates collapsed.
pub async fn preflight(
    State(state): State<AppState>,
    Json(request): Json<PreflightRequest>,
) -> Result<Json<PreflightResponse>, ApiError> {
    let mut missing: Vec<String> = Vec::new();
    for file in &request.files {
        validate_bundle_path(&file.bundle_path)?;
        validate_hash(&file.hash)?;
        if !state.store.exists(&file.hash) && !missing.contains(&file.hash) {
            missing.push(file.hash.clone());
        }
    }
    Ok(Json(PreflightResponse { missing }))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub size_bytes: u64,
}

/// `PUT /blobs/{hash}`: store the raw request body as a blob. Idempotent;
/// a repeat upload of a published hash succeeds with `200 exists`.
pub async fn upload_blob(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<UploadParams>,
    body: Body,
) -> Result<(StatusCode, Json<CreateBlobResponse>), ApiError> {
    let outcome = state
        .store
        .put_stream(&hash, params.size_bytes, body.into_data_stream())
        .await?;

    let (code, status) = match outcome {
        UploadOutcome::Created => (StatusCode::CREATED, BlobStatus::Created),
        UploadOutcome::Exists => (StatusCode::OK, BlobStatus::Exists),
    };
    Ok((code, Json(CreateBlobResponse { status, hash })))
}
