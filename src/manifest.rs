//! Bundle manifest and summary types plus boundary validation
//!
//! Validation happens once, at the boundary: a draft accepted by
//! [`BundleDraft::validate`] carries only well-formed paths and hashes,
//! and downstream code relies on that.

use crate::hash::validate_hash;
use crate::merkle::compute_merkle_root;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Hash algorithm for blob identities. Only SHA-256 is defined by the
/// wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgo {
    #[default]
    Sha256,
}

/// A single file within a bundle: a relative POSIX path bound to a blob
/// by content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative path within the bundle. No leading '/', no '..' segments.
    pub bundle_path: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the file content
    pub hash: String,
    /// Hash algorithm used
    pub hash_algo: HashAlgo,
}

/// Client-submitted manifest draft, validated and completed by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDraft {
    /// Optional client-supplied bundle id; duplicates are rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Files making up the bundle
    pub files: Vec<FileEntry>,
    /// Hash algorithm used for every entry
    #[serde(default)]
    pub hash_algo: HashAlgo,
    /// Client-computed Merkle root, cross-checked by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
}

/// Core bundle metadata, stored without the files list so listings stay
/// proportional to the number of bundles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    /// Time-sortable bundle identifier (ULID)
    pub id: String,
    /// ISO-8601 UTC creation timestamp with trailing 'Z'
    pub created_at: String,
    /// Hash algorithm used
    pub hash_algo: HashAlgo,
    /// Number of files in the bundle
    pub file_count: usize,
    /// Total size of all files in bytes
    pub total_bytes: u64,
    /// Merkle root over the bundle's (path, hash) pairs
    pub merkle_root: String,
}

/// Complete persisted bundle description, including the files list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    pub id: String,
    pub created_at: String,
    pub hash_algo: HashAlgo,
    pub file_count: usize,
    pub total_bytes: u64,
    pub merkle_root: String,
    pub files: Vec<FileEntry>,
}

impl BundleManifest {
    /// Project this manifest onto its summary.
    pub fn summary(&self) -> BundleSummary {
        BundleSummary {
            id: self.id.clone(),
            created_at: self.created_at.clone(),
            hash_algo: self.hash_algo,
            file_count: self.file_count,
            total_bytes: self.total_bytes,
            merkle_root: self.merkle_root.clone(),
        }
    }

    /// Merkle root recomputed from the files list.
    pub fn computed_merkle_root(&self) -> String {
        compute_merkle_root(
            self.files
                .iter()
                .map(|f| (f.bundle_path.as_str(), f.hash.as_str())),
        )
    }
}

impl BundleDraft {
    /// Validate every entry's path and hash, and reject duplicate paths.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.files {
            validate_bundle_path(&entry.bundle_path)?;
            validate_hash(&entry.hash)?;
            if !seen.insert(entry.bundle_path.as_str()) {
                return Err(Error::InvalidPath {
                    path: entry.bundle_path.clone(),
                    reason: "duplicate bundle path".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Merkle root over the draft's (path, hash) pairs.
    pub fn computed_merkle_root(&self) -> String {
        compute_merkle_root(
            self.files
                .iter()
                .map(|f| (f.bundle_path.as_str(), f.hash.as_str())),
        )
    }

    /// Sum of the declared file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Validate a bundle-relative path: non-empty, no leading '/', no '..'
/// segment.
pub fn validate_bundle_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "path cannot be empty".to_string(),
        });
    }
    if path.starts_with('/') {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "path must be relative (no leading '/')".to_string(),
        });
    }
    if path.split('/').any(|segment| segment == "..") {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "path cannot contain '..'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, hash: &str, size: u64) -> FileEntry {
        FileEntry {
            bundle_path: path.to_string(),
            size_bytes: size,
            hash: hash.to_string(),
            hash_algo: HashAlgo::Sha256,
        }
    }

    #[test]
    fn test_path_rules() {
        assert!(validate_bundle_path("a.txt").is_ok());
        assert!(validate_bundle_path("dir/sub/file.bin").is_ok());
        assert!(validate_bundle_path("dotdot..name/ok").is_ok());

        assert!(validate_bundle_path("").is_err());
        assert!(validate_bundle_path("/etc/passwd").is_err());
        assert!(validate_bundle_path("../escape").is_err());
        assert!(validate_bundle_path("a/../b").is_err());
        assert!(validate_bundle_path("a/b/..").is_err());
    }

    #[test]
    fn test_draft_validation() {
        let good = BundleDraft {
            id: None,
            files: vec![
                entry("a.txt", &"a".repeat(64), 1),
                entry("b.txt", &"b".repeat(64), 2),
            ],
            hash_algo: HashAlgo::Sha256,
            merkle_root: None,
        };
        assert!(good.validate().is_ok());
        assert_eq!(good.total_bytes(), 3);

        let dup = BundleDraft {
            files: vec![
                entry("same.txt", &"a".repeat(64), 1),
                entry("same.txt", &"b".repeat(64), 2),
            ],
            ..good.clone()
        };
        assert!(matches!(dup.validate(), Err(Error::InvalidPath { .. })));

        let bad_hash = BundleDraft {
            files: vec![entry("a.txt", "nothex", 1)],
            ..good
        };
        assert!(matches!(bad_hash.validate(), Err(Error::InvalidHash { .. })));
    }

    #[test]
    fn test_hash_algo_wire_format() {
        let json = serde_json::to_string(&HashAlgo::Sha256).unwrap();
        assert_eq!(json, "\"sha256\"");
        let parsed: HashAlgo = serde_json::from_str("\"sha256\"").unwrap();
        assert_eq!(parsed, HashAlgo::Sha256);
        assert!(serde_json::from_str::<HashAlgo>("\"md5\"").is_err());
    }

    #[test]
    fn test_summary_projection() {
        let manifest = BundleManifest {
            id: "01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string(),
            created_at: "2024-01-15T10:30:00Z".to_string(),
            hash_algo: HashAlgo::Sha256,
            file_count: 1,
            total_bytes: 5,
            merkle_root: "c".repeat(64),
            files: vec![entry("a.txt", &"a".repeat(64), 5)],
        };

        let summary = manifest.summary();
        assert_eq!(summary.id, manifest.id);
        assert_eq!(summary.file_count, 1);
        assert_eq!(summary.total_bytes, 5);

        // Summary serialization carries no files field
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("files").is_none());
        assert_eq!(value["hash_algo"], "sha256");
    }
}
