//! SHA-256 helpers with streaming support for large files

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming file hashes (64 KiB)
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Hex SHA-256 of the empty byte string
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Compute the lowercase hex SHA-256 of in-memory bytes.
///
/// For large files use [`hash_file`], which streams in fixed chunks.
pub fn hash_bytes(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Compute the lowercase hex SHA-256 of a file by streaming it in
/// [`HASH_CHUNK_SIZE`] chunks, so arbitrarily large files never have to
/// fit in memory.
pub async fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check whether a string is a valid blob identity: exactly 64 lowercase
/// hex characters.
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

/// Validate a blob identity, surfacing why it is rejected.
pub fn validate_hash(hash: &str) -> Result<()> {
    if hash.len() != 64 {
        return Err(Error::InvalidHash {
            reason: format!("SHA-256 hash must be exactly 64 characters, got {}", hash.len()),
        });
    }
    if !hash.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
        return Err(Error::InvalidHash {
            reason: "hash must be lowercase hexadecimal (0-9, a-f)".to_string(),
        });
    }
    Ok(())
}
