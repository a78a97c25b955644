//! HTTP surface of the bundle store
//!
//! The server owns the data root; everything else talks to it through
//! this API. Handlers validate at the boundary and delegate to the blob
//! store and registry, whose error kinds map onto status codes here.

use crate::api::{ErrorResponse, StatusResponse};
use crate::blobstore::BlobStore;
use crate::config::ServerConfig;
use crate::registry::BundleRegistry;
use crate::{Error, Result};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod blobs;
mod bundles;

/// Shared per-request state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BlobStore>,
    pub registry: Arc<BundleRegistry>,
    pub page_size: usize,
}

impl AppState {
    /// Open the blob store and registry under the configured data root.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Ok(Self {
            store: Arc::new(BlobStore::open(
                &config.data_dir,
                config.max_upload_bytes,
            )?),
            registry: Arc::new(BundleRegistry::open(&config.data_dir)?),
            page_size: crate::config::DEFAULT_PAGE_SIZE,
        })
    }
}

/// Error wrapper that renders registry/store failures as HTTP responses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidHash { .. } | Error::InvalidPath { .. } | Error::Serialization(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::HashMismatch { .. }
            | Error::MissingBlobs { .. }
            | Error::MerkleMismatch { .. }
            | Error::IdConflict { .. } => StatusCode::CONFLICT,
            Error::BundleNotFound { .. } => StatusCode::NOT_FOUND,
            Error::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }

        (
            status,
            Json(ErrorResponse {
                detail: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/blobs/:hash", put(blobs::upload_blob))
        .route("/bundles/preflight", post(blobs::preflight))
        .route(
            "/bundles",
            post(bundles::create_bundle).get(bundles::list_bundles),
        )
        .route("/bundles/:id/download", get(bundles::download_bundle))
        .with_state(state)
}

async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

/// Bind and run the server until the task is cancelled.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config)?;
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, data_dir = %config.data_dir.display(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CreateBundleResponse, ListBundlesResponse, PreflightResponse};
    use crate::hash::hash_bytes;
    use crate::manifest::{BundleDraft, FileEntry, HashAlgo};
    use crate::merkle::compute_merkle_root;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Read;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const HELLO_HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            max_upload_bytes: 1024 * 1024,
            ..ServerConfig::default()
        };
        let app = router(AppState::new(&config).unwrap());
        (dir, app)
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put_blob_request(hash: &str, size: u64, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(format!("/blobs/{hash}?size_bytes={size}"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, value: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(value).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn upload_hello(app: &Router) {
        let response = app
            .clone()
            .oneshot(put_blob_request(HELLO_HASH, 5, b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    fn entry(path: &str, hash: &str, size: u64) -> FileEntry {
        FileEntry {
            bundle_path: path.to_string(),
            size_bytes: size,
            hash: hash.to_string(),
            hash_algo: HashAlgo::Sha256,
        }
    }

    fn draft_value(files: Vec<FileEntry>) -> serde_json::Value {
        let root = compute_merkle_root(
            files.iter().map(|f| (f.bundle_path.as_str(), f.hash.as_str())),
        );
        serde_json::to_value(BundleDraft {
            id: None,
            files,
            hash_algo: HashAlgo::Sha256,
            merkle_root: Some(root),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (_dir, app) = test_app();
        let response = app.oneshot(get_request("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_idempotent_blob_upload() {
        let (dir, app) = test_app();

        let first = app
            .clone()
            .oneshot(put_blob_request(HELLO_HASH, 5, b"hello"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(
            response_json(first).await,
            json!({"status": "created", "hash": HELLO_HASH})
        );

        let second = app
            .clone()
            .oneshot(put_blob_request(HELLO_HASH, 5, b"hello"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(
            response_json(second).await,
            json!({"status": "exists", "hash": HELLO_HASH})
        );

        let blob_path = dir
            .path()
            .join("blobs")
            .join("2c")
            .join("f2")
            .join(HELLO_HASH);
        assert_eq!(std::fs::read(blob_path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_blob_hash_mismatch() {
        let (dir, app) = test_app();
        let wrong = "a".repeat(64);

        let response = app
            .oneshot(Request::builder()
                .method("PUT")
                .uri(format!("/blobs/{wrong}?size_bytes=5"))
                .body(Body::from(&b"hello"[..]))
                .unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(!dir.path().join("blobs").join("aa").join("aa").exists());
    }

    #[tokio::test]
    async fn test_blob_validation_errors() {
        let (_dir, app) = test_app();

        let response = app
            .clone()
            .oneshot(put_blob_request("nothex", 5, b"hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let big = app
            .oneshot(put_blob_request(HELLO_HASH, 1024 * 1024 + 1, b"hello"))
            .await
            .unwrap();
        assert_eq!(big.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_preflight_reports_missing() {
        let (_dir, app) = test_app();
        upload_hello(&app).await;
        let absent = hash_bytes(b"nothing uploaded yet");

        let request = json_request(
            "POST",
            "/bundles/preflight",
            &json!({"files": [
                {"bundle_path": "a.txt", "size_bytes": 5, "hash": HELLO_HASH, "hash_algo": "sha256"},
                {"bundle_path": "b.txt", "size_bytes": 20, "hash": absent, "hash_algo": "sha256"},
            ]}),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let parsed: PreflightResponse =
            serde_json::from_value(response_json(response).await).unwrap();
        assert_eq!(parsed.missing, vec![absent]);
    }

    #[tokio::test]
    async fn test_preflight_rejects_bad_path() {
        let (_dir, app) = test_app();
        let request = json_request(
            "POST",
            "/bundles/preflight",
            &json!({"files": [
                {"bundle_path": "../escape", "size_bytes": 1, "hash": HELLO_HASH, "hash_algo": "sha256"},
            ]}),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_create_bundle_missing_blob() {
        let (dir, app) = test_app();
        let absent = hash_bytes(b"never uploaded");

        let request = json_request(
            "POST",
            "/bundles",
            &draft_value(vec![entry("a.txt", &absent, 14)]),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains(&absent));
        assert_eq!(
            std::fs::read_dir(dir.path().join("bundles/manifests"))
                .unwrap()
                .count(),
            0
        );
        assert_eq!(
            std::fs::read_dir(dir.path().join("bundles/summaries"))
                .unwrap()
                .count(),
            0
        );
    }

    #[tokio::test]
    async fn test_create_list_and_download_flow() {
        let (_dir, app) = test_app();
        upload_hello(&app).await;

        let request = json_request(
            "POST",
            "/bundles",
            &draft_value(vec![entry("greeting/hello.txt", HELLO_HASH, 5)]),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreateBundleResponse =
            serde_json::from_value(response_json(response).await).unwrap();
        assert_eq!(
            created.merkle_root,
            compute_merkle_root([("greeting/hello.txt", HELLO_HASH)])
        );

        let response = app.clone().oneshot(get_request("/bundles")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: ListBundlesResponse =
            serde_json::from_value(response_json(response).await).unwrap();
        assert_eq!(listed.bundles.len(), 1);
        assert_eq!(listed.bundles[0].id, created.id);
        assert_eq!(listed.bundles[0].file_count, 1);
        assert_eq!(listed.bundles[0].total_bytes, 5);

        let response = app
            .oneshot(get_request(&format!("/bundles/{}/download", created.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/zip"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap(),
            format!("attachment; filename=\"bundle_{}.zip\"", created.id)
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
        let mut content = Vec::new();
        archive
            .by_name("greeting/hello.txt")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"hello");
    }

    #[tokio::test]
    async fn test_create_bundle_merkle_mismatch() {
        let (_dir, app) = test_app();
        upload_hello(&app).await;

        let mut value = draft_value(vec![entry("a.txt", HELLO_HASH, 5)]);
        value["merkle_root"] = json!("0".repeat(64));

        let response = app
            .oneshot(json_request("POST", "/bundles", &value))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response_json(response).await;
        assert!(body["detail"].as_str().unwrap().contains("Merkle root"));
    }

    #[tokio::test]
    async fn test_create_bundle_id_conflict() {
        let (_dir, app) = test_app();
        upload_hello(&app).await;

        let mut value = draft_value(vec![entry("a.txt", HELLO_HASH, 5)]);
        value["id"] = json!("pinned-id");

        let first = app
            .clone()
            .oneshot(json_request("POST", "/bundles", &value))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(json_request("POST", "/bundles", &value))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_listing_skips_corrupt_summary() {
        let (dir, app) = test_app();
        upload_hello(&app).await;
        let request = json_request(
            "POST",
            "/bundles",
            &draft_value(vec![entry("a.txt", HELLO_HASH, 5)]),
        );
        assert_eq!(
            app.clone().oneshot(request).await.unwrap().status(),
            StatusCode::CREATED
        );

        std::fs::write(dir.path().join("bundles/summaries/fragment.json"), "{").unwrap();

        let response = app.oneshot(get_request("/bundles")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: ListBundlesResponse =
            serde_json::from_value(response_json(response).await).unwrap();
        assert_eq!(listed.bundles.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_pagination() {
        let (_dir, app) = test_app();
        upload_hello(&app).await;

        for name in ["p-one", "p-two", "p-three"] {
            let mut value = draft_value(vec![entry("a.txt", HELLO_HASH, 5)]);
            value["id"] = json!(name);
            let response = app
                .clone()
                .oneshot(json_request("POST", "/bundles", &value))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let page1: ListBundlesResponse = serde_json::from_value(
            response_json(
                app.clone()
                    .oneshot(get_request("/bundles?page=1&page_size=2"))
                    .await
                    .unwrap(),
            )
            .await,
        )
        .unwrap();
        assert_eq!(page1.bundles.len(), 2);

        let page2: ListBundlesResponse = serde_json::from_value(
            response_json(
                app.clone()
                    .oneshot(get_request("/bundles?page=2&page_size=2"))
                    .await
                    .unwrap(),
            )
            .await,
        )
        .unwrap();
        assert_eq!(page2.bundles.len(), 1);

        let beyond: ListBundlesResponse = serde_json::from_value(
            response_json(
                app.oneshot(get_request("/bundles?page=5&page_size=2"))
                    .await
                    .unwrap(),
            )
            .await,
        )
        .unwrap();
        assert!(beyond.bundles.is_empty());
    }

    #[tokio::test]
    async fn test_download_errors() {
        let (_dir, app) = test_app();

        let response = app
            .clone()
            .oneshot(get_request("/bundles/does-not-exist/download"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        upload_hello(&app).await;
        let mut value = draft_value(vec![entry("a.txt", HELLO_HASH, 5)]);
        value["id"] = json!("fmt-check");
        app.clone()
            .oneshot(json_request("POST", "/bundles", &value))
            .await
            .unwrap();

        let response = app
            .oneshot(get_request("/bundles/fmt-check/download?format=tar"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_empty_bundle_create() {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(json_request("POST", "/bundles", &draft_value(vec![])))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreateBundleResponse =
            serde_json::from_value(response_json(response).await).unwrap();
        assert_eq!(created.merkle_root, crate::hash::EMPTY_SHA256);
    }
}
