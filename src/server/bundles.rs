//! Bundle create, list and download handlers

use super::{ApiError, AppState};
use crate::api::{CreateBundleResponse, ListBundlesResponse};
use crate::archive::{archive_filename, build_zip};
use crate::manifest::BundleDraft;
use crate::Error;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

/// `POST /bundles`: commit a manifest draft whose blobs are already
/// published. Not idempotent unless the client pins an id.
pub async fn create_bundle(
    State(state): State<AppState>,
    Json(draft): Json<BundleDraft>,
) -> Result<(StatusCode, Json<CreateBundleResponse>), ApiError> {
    let summary = state.registry.create(&state.store, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateBundleResponse {
            id: summary.id,
            created_at: summary.created_at,
            merkle_root: summary.merkle_root,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// `GET /bundles`: summaries newest first, paginated. Pages past the end
/// are empty, not errors.
pub async fn list_bundles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListBundlesResponse>, ApiError> {
    let all = state.registry.list().await?;

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(state.page_size).max(1);
    let bundles = all
        .into_iter()
        .skip(page_size * (page - 1))
        .take(page_size)
        .collect();

    Ok(Json(ListBundlesResponse { bundles }))
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub format: Option<String>,
}

/// `GET /bundles/{id}/download`: the bundle's files as a ZIP archive.
pub async fn download_bundle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let format = params.format.unwrap_or_else(|| "zip".to_string());
    if format != "zip" {
        return Err(Error::UnsupportedFormat { format }.into());
    }

    let manifest = state.registry.manifest(&id).await?;

    // The zip writer is synchronous; keep it off the async workers.
    let store = state.store.clone();
    let bytes = tokio::task::spawn_blocking(move || build_zip(&manifest, &store))
        .await
        .map_err(|e| Error::Storage {
            reason: format!("archive task failed: {e}"),
        })??;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", archive_filename(&id)),
        ),
    ];
    Ok((headers, bytes).into_response())
}
