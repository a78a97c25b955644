//! Content-addressed blob storage with streaming hash verification
//!
//! Blobs are keyed by the lowercase hex SHA-256 of their bytes and live
//! under a two-level fan-out (`blobs/<xx>/<yy>/<hash>`) that caps
//! per-directory entry counts. Uploads stream into a staging file under
//! `tmp/` while being hashed, and a single rename publishes the blob:
//! either the final file exists with verified content or nothing does.

use crate::hash::validate_hash;
use crate::{Error, Result};
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of a blob upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The blob was published by this upload
    Created,
    /// A blob with this identity was already published
    Exists,
}

/// Filesystem-backed content-addressed blob store
#[derive(Debug)]
pub struct BlobStore {
    blobs_dir: PathBuf,
    tmp_dir: PathBuf,
    max_upload_bytes: u64,
}

impl BlobStore {
    /// Open a blob store under `data_dir`, creating the `blobs/` and
    /// `tmp/` directories if needed.
    pub fn open<P: AsRef<Path>>(data_dir: P, max_upload_bytes: u64) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let blobs_dir = data_dir.join("blobs");
        let tmp_dir = data_dir.join("tmp");

        std::fs::create_dir_all(&blobs_dir)?;
        std::fs::create_dir_all(&tmp_dir)?;

        Ok(Self {
            blobs_dir,
            tmp_dir,
            max_upload_bytes,
        })
    }

    /// Deterministic fan-out path for a blob:
    /// `blobs/<hash[0:2]>/<hash[2:4]>/<hash>`.
    ///
    /// The hash must already be validated.
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.blobs_dir.join(&hash[..2]).join(&hash[2..4]).join(hash)
    }

    /// Whether a blob with this identity is published.
    pub fn exists(&self, hash: &str) -> bool {
        validate_hash(hash).is_ok() && self.blob_path(hash).exists()
    }

    /// Largest accepted declared upload size.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Store a blob from a byte stream.
    ///
    /// The hash and declared size are checked before the filesystem is
    /// touched; an upload whose identity is already published succeeds
    /// without reading the stream. Otherwise every chunk is fed to both a
    /// staging file and a running SHA-256, and the digest must equal
    /// `hash` for the blob to be published. The declared size is not
    /// authoritative; only the hash is.
    pub async fn put_stream<S, E>(
        &self,
        hash: &str,
        declared_size: u64,
        mut stream: S,
    ) -> Result<UploadOutcome>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        validate_hash(hash)?;

        if declared_size > self.max_upload_bytes {
            return Err(Error::TooLarge {
                declared: declared_size,
                max: self.max_upload_bytes,
            });
        }

        if self.exists(hash) {
            // Drain the body so a duplicate upload still completes
            // cleanly on the wire instead of desyncing the connection.
            while stream.next().await.is_some() {}
            debug!(hash, "blob already published, skipping upload");
            return Ok(UploadOutcome::Exists);
        }

        let tmp_path = self.staging_path();
        match self.write_and_verify(&tmp_path, hash, stream).await {
            Ok(()) => {}
            Err(e) => {
                remove_quietly(&tmp_path).await;
                return Err(e);
            }
        }

        let final_path = self.blob_path(hash);
        if let Err(e) = self.publish(&tmp_path, &final_path).await {
            remove_quietly(&tmp_path).await;
            return Err(e);
        }

        debug!(hash, "blob published");
        Ok(UploadOutcome::Created)
    }

    /// Unique staging path under `tmp/`: timestamp plus a random token.
    fn staging_path(&self) -> PathBuf {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S%.6f");
        self.tmp_dir
            .join(format!("{}_{}", timestamp, Uuid::new_v4()))
    }

    async fn write_and_verify<S, E>(&self, tmp_path: &Path, hash: &str, mut stream: S) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let mut file = tokio::fs::File::create(tmp_path).await?;
        let mut hasher = Sha256::new();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Storage {
                reason: format!("upload stream failed: {e}"),
            })?;
            hasher.update(&chunk);
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        let actual = hex::encode(hasher.finalize());
        if actual != hash {
            warn!(expected = hash, actual = %actual, written, "upload hash mismatch");
            return Err(Error::HashMismatch {
                expected: hash.to_string(),
                actual,
            });
        }

        Ok(())
    }

    /// Rename the verified staging file into its fan-out location. The
    /// rename is the commit point; a concurrent upload of the same hash
    /// races harmlessly because both files carry identical bytes.
    async fn publish(&self, tmp_path: &Path, final_path: &Path) -> Result<()> {
        let parent = final_path.parent().expect("fan-out path has a parent");
        tokio::fs::create_dir_all(parent).await?;
        tokio::fs::rename(tmp_path, final_path).await?;
        Ok(())
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove staging file");
        }
    }
}
