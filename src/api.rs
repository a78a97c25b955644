//! Wire contracts shared by the HTTP server and the client

use crate::manifest::{BundleSummary, FileEntry};
use serde::{Deserialize, Serialize};

/// `POST /bundles/preflight` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightRequest {
    pub files: Vec<FileEntry>,
}

/// `POST /bundles/preflight` response: hashes not yet published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightResponse {
    pub missing: Vec<String>,
}

/// Blob upload status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobStatus {
    Created,
    Exists,
}

/// `PUT /blobs/{hash}` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlobResponse {
    pub status: BlobStatus,
    pub hash: String,
}

/// `POST /bundles` success response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBundleResponse {
    pub id: String,
    pub created_at: String,
    pub merkle_root: String,
}

/// `GET /bundles` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBundlesResponse {
    pub bundles: Vec<BundleSummary>,
}

/// Error payload carried by every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// `GET /status` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}
