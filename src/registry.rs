//! Bundle registry: manifest and summary persistence
//!
//! Manifests (with files) and summaries (without) are committed together
//! at create time and never mutated. Each JSON document is written via
//! temp file + rename; if the summary cannot be written after the
//! manifest renamed into place, the manifest is unlinked again so the
//! pair invariant holds.

use crate::blobstore::BlobStore;
use crate::manifest::{BundleDraft, BundleManifest, BundleSummary, HashAlgo};
use crate::merkle::compute_merkle_root;
use crate::{Error, Result};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use ulid::Ulid;

/// Filesystem-backed registry of immutable bundles
#[derive(Debug)]
pub struct BundleRegistry {
    manifests_dir: PathBuf,
    summaries_dir: PathBuf,
}

/// On-disk summary shape. `merkle_root` is optional to tolerate summaries
/// written before the root was recorded; listings backfill it.
#[derive(Debug, Deserialize)]
struct StoredSummary {
    id: String,
    created_at: String,
    #[serde(default)]
    hash_algo: HashAlgo,
    #[serde(default)]
    file_count: usize,
    #[serde(default)]
    total_bytes: u64,
    #[serde(default)]
    merkle_root: Option<String>,
}

impl BundleRegistry {
    /// Open a registry under `data_dir`, creating
    /// `bundles/manifests/` and `bundles/summaries/` if needed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let bundles_dir = data_dir.as_ref().join("bundles");
        let manifests_dir = bundles_dir.join("manifests");
        let summaries_dir = bundles_dir.join("summaries");

        std::fs::create_dir_all(&manifests_dir)?;
        std::fs::create_dir_all(&summaries_dir)?;

        Ok(Self {
            manifests_dir,
            summaries_dir,
        })
    }

    /// Validate a draft, enforce blob closure, cross-check the Merkle
    /// root, and commit manifest plus summary atomically.
    pub async fn create(&self, store: &BlobStore, draft: BundleDraft) -> Result<BundleSummary> {
        draft.validate()?;

        // Referential integrity gate: every entry must resolve to a
        // published blob. Duplicate hashes are reported once.
        let mut missing = Vec::new();
        for entry in &draft.files {
            if !store.exists(&entry.hash) && !missing.contains(&entry.hash) {
                missing.push(entry.hash.clone());
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingBlobs { hashes: missing });
        }

        let merkle_root = draft.computed_merkle_root();
        if let Some(claimed) = &draft.merkle_root {
            if claimed != &merkle_root {
                return Err(Error::MerkleMismatch {
                    expected: merkle_root,
                    actual: claimed.clone(),
                });
            }
        }

        let id = match &draft.id {
            Some(id) => {
                if self.manifest_path(id).exists() {
                    return Err(Error::IdConflict { id: id.clone() });
                }
                id.clone()
            }
            None => Ulid::new().to_string(),
        };

        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let manifest = BundleManifest {
            id: id.clone(),
            created_at,
            hash_algo: draft.hash_algo,
            file_count: draft.files.len(),
            total_bytes: draft.total_bytes(),
            merkle_root,
            files: draft.files,
        };
        let summary = manifest.summary();

        self.commit(&manifest, &summary).await?;
        info!(
            id = %manifest.id,
            files = manifest.file_count,
            bytes = manifest.total_bytes,
            "bundle committed"
        );

        Ok(summary)
    }

    /// Load a bundle's full manifest.
    pub async fn manifest(&self, id: &str) -> Result<BundleManifest> {
        let path = self.manifest_path(id);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::BundleNotFound { id: id.to_string() })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&content)?)
    }

    /// List all bundle summaries, newest first.
    ///
    /// A summary that fails to parse is logged and skipped; one corrupt
    /// entry must never break listings.
    pub async fn list(&self) -> Result<Vec<BundleSummary>> {
        let mut summaries = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.summaries_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match self.load_summary(&path).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable summary");
                }
            }
        }

        // ISO-8601 Z-suffix timestamps sort correctly as strings; ids
        // break ties so ordering stays stable within one second.
        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(summaries)
    }

    async fn load_summary(&self, path: &Path) -> Result<BundleSummary> {
        let content = tokio::fs::read(path).await?;
        let stored: StoredSummary = serde_json::from_slice(&content)?;

        let merkle_root = match stored.merkle_root {
            Some(root) => root,
            None => self.backfill_merkle_root(&stored.id).await?,
        };

        Ok(BundleSummary {
            id: stored.id,
            created_at: stored.created_at,
            hash_algo: stored.hash_algo,
            file_count: stored.file_count,
            total_bytes: stored.total_bytes,
            merkle_root,
        })
    }

    /// Legacy summaries carry no root; take it from the manifest, or
    /// recompute it from the manifest's files.
    async fn backfill_merkle_root(&self, id: &str) -> Result<String> {
        let manifest = self.manifest(id).await?;
        if !manifest.merkle_root.is_empty() {
            return Ok(manifest.merkle_root);
        }
        Ok(compute_merkle_root(
            manifest
                .files
                .iter()
                .map(|f| (f.bundle_path.as_str(), f.hash.as_str())),
        ))
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        self.manifests_dir.join(format!("{id}.json"))
    }

    fn summary_path(&self, id: &str) -> PathBuf {
        self.summaries_dir.join(format!("{id}.json"))
    }

    async fn commit(&self, manifest: &BundleManifest, summary: &BundleSummary) -> Result<()> {
        let manifest_path = self.manifest_path(&manifest.id);
        let summary_path = self.summary_path(&summary.id);

        write_json_atomic(&manifest_path, manifest).await?;

        if let Err(e) = write_json_atomic(&summary_path, summary).await {
            // Keep the pair invariant: without a summary, the manifest
            // must not remain visible.
            let _ = tokio::fs::remove_file(&manifest_path).await;
            return Err(e);
        }

        Ok(())
    }
}

/// Write a JSON document via `<path>.tmp` + rename.
async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let content = serde_json::to_vec_pretty(value)?;

    let write_result = async {
        tokio::fs::write(&tmp_path, &content).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok::<(), Error>(())
    }
    .await;

    if write_result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    write_result
}
