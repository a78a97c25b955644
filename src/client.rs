//! HTTP client for the bundle store API

use crate::api::{
    CreateBundleResponse, ErrorResponse, ListBundlesResponse, PreflightRequest, PreflightResponse,
};
use crate::config::ClientConfig;
use crate::manifest::{BundleDraft, BundleSummary, FileEntry};
use crate::{Error, Result};
use reqwest::StatusCode;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Client for the bundle store REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the given base URL with a per-request timeout.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Ask the server which of the given files' hashes are missing.
    pub async fn preflight(&self, files: &[FileEntry]) -> Result<Vec<String>> {
        let url = format!("{}/bundles/preflight", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&PreflightRequest {
                files: files.to_vec(),
            })
            .send()
            .await?;

        let response = check_status(response).await?;
        let parsed: PreflightResponse = response.json().await?;
        Ok(parsed.missing)
    }

    /// Upload one blob from a local file, streaming the body. Returns
    /// true if the upload published the blob, false if it already
    /// existed.
    pub async fn upload_blob(&self, hash: &str, size_bytes: u64, path: &Path) -> Result<bool> {
        let url = format!("{}/blobs/{}", self.base_url, hash);
        let file = tokio::fs::File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .http
            .put(&url)
            .query(&[("size_bytes", size_bytes)])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        check_status(response).await?;
        let created = status == StatusCode::CREATED;
        debug!(hash, created, "blob uploaded");
        Ok(created)
    }

    /// Commit a bundle manifest draft.
    pub async fn create_bundle(&self, draft: &BundleDraft) -> Result<CreateBundleResponse> {
        let url = format!("{}/bundles", self.base_url);
        let response = self.http.post(&url).json(draft).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// List bundle summaries, newest first.
    pub async fn list_bundles(
        &self,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Result<Vec<BundleSummary>> {
        let url = format!("{}/bundles", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }
        if let Some(page_size) = page_size {
            request = request.query(&[("page_size", page_size)]);
        }

        let response = check_status(request.send().await?).await?;
        let parsed: ListBundlesResponse = response.json().await?;
        Ok(parsed.bundles)
    }

    /// Start a bundle archive download. The caller drains the returned
    /// response in chunks.
    pub async fn download_bundle(&self, id: &str, format: &str) -> Result<reqwest::Response> {
        let url = format!("{}/bundles/{}/download", self.base_url, id);
        let response = self
            .http
            .get(&url)
            .query(&[("format", format)])
            .send()
            .await?;
        check_status(response).await
    }
}

/// Turn a non-2xx response into [`Error::Api`], carrying the server's
/// `detail` message when one is present.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = match response.json::<ErrorResponse>().await {
        Ok(body) => body.detail,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    Err(Error::Api {
        status: status.as_u16(),
        detail,
    })
}
