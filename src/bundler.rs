//! Client-side bundle creation pipeline
//!
//! Orchestrates the full create workflow: discover files, hash each one
//! with streaming SHA-256, ask the server what is missing, upload only
//! those blobs with bounded concurrency, then commit the manifest and
//! cross-check the server's Merkle root against the local one.

use crate::client::ApiClient;
use crate::discover::{discover_files, DiscoveredFile};
use crate::hash::hash_file;
use crate::manifest::{BundleDraft, FileEntry, HashAlgo};
use crate::{Error, Result};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Bounded parallelism for blob uploads
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

/// Result of a completed create run
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub id: String,
    pub created_at: String,
    pub merkle_root: String,
    pub file_count: usize,
    pub total_bytes: u64,
    /// Blobs actually transferred (deduplicated against the server and
    /// within the job)
    pub uploaded: usize,
}

/// Create a bundle from local paths.
pub async fn create_bundle(
    client: &ApiClient,
    inputs: &[PathBuf],
    concurrency: usize,
) -> Result<CreateOutcome> {
    let discovered = discover_files(inputs)?;
    let total_bytes: u64 = discovered.iter().map(|f| f.size_bytes).sum();
    info!(files = discovered.len(), total_bytes, "discovered input files");

    let entries = hash_discovered(&discovered).await?;

    let missing: HashSet<String> = client.preflight(&entries).await?.into_iter().collect();
    debug!(missing = missing.len(), "preflight complete");

    // One upload per distinct missing hash, even when several bundle
    // paths share the content.
    let mut jobs: HashMap<String, (u64, PathBuf)> = HashMap::new();
    for (entry, file) in entries.iter().zip(&discovered) {
        if missing.contains(&entry.hash) {
            jobs.entry(entry.hash.clone())
                .or_insert_with(|| (file.size_bytes, file.absolute_path.clone()));
        }
    }
    let uploaded = jobs.len();

    let concurrency = concurrency.max(1);
    let mut uploads = stream::iter(jobs.into_iter().map(|(hash, (size_bytes, path))| {
        let client = client.clone();
        async move { client.upload_blob(&hash, size_bytes, &path).await }
    }))
    .buffer_unordered(concurrency);

    while let Some(result) = uploads.next().await {
        result?;
    }
    info!(uploaded, "blob uploads complete");

    let draft = BundleDraft {
        id: None,
        hash_algo: HashAlgo::Sha256,
        merkle_root: None,
        files: entries,
    };
    let merkle_root = draft.computed_merkle_root();
    let draft = BundleDraft {
        merkle_root: Some(merkle_root.clone()),
        ..draft
    };

    let response = client.create_bundle(&draft).await?;

    // Agreement here proves both sides saw the same (path, hash) set.
    if response.merkle_root != merkle_root {
        return Err(Error::MerkleMismatch {
            expected: merkle_root,
            actual: response.merkle_root,
        });
    }

    Ok(CreateOutcome {
        id: response.id,
        created_at: response.created_at,
        merkle_root: response.merkle_root,
        file_count: draft.files.len(),
        total_bytes,
        uploaded,
    })
}

/// Hash every discovered file, streaming each through SHA-256.
async fn hash_discovered(discovered: &[DiscoveredFile]) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::with_capacity(discovered.len());
    for file in discovered {
        let hash = hash_file(&file.absolute_path).await?;
        entries.push(FileEntry {
            bundle_path: file.bundle_path.clone(),
            size_bytes: file.size_bytes,
            hash,
            hash_algo: HashAlgo::Sha256,
        });
    }
    Ok(entries)
}
