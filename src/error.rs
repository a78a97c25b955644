//! Error types for packstore

use thiserror::Error;

/// Main error type for packstore operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    #[error("Invalid bundle path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Declared size {declared} exceeds maximum allowed {max}")]
    TooLarge { declared: u64, max: u64 },

    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Missing blobs: {}", .hashes.join(", "))]
    MissingBlobs { hashes: Vec<String> },

    #[error("Merkle root mismatch: expected {expected}, got {actual}")]
    MerkleMismatch { expected: String, actual: String },

    #[error("Bundle ID '{id}' already exists")]
    IdConflict { id: String },

    #[error("Bundle '{id}' not found")]
    BundleNotFound { id: String },

    #[error("Unsupported format '{format}'. Only 'zip' is supported.")]
    UnsupportedFormat { format: String },

    #[error("No files discovered from input paths")]
    NoFilesFound,

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },
}

/// Result type alias for packstore operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for the client CLI: 2 for invalid input or a
    /// missing file, 4 for network and I/O failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidHash { .. }
            | Error::InvalidPath { .. }
            | Error::UnsupportedFormat { .. }
            | Error::NoFilesFound
            | Error::BundleNotFound { .. }
            | Error::Configuration { .. } => 2,
            Error::Api { status: 404, .. } => 2,
            _ => 4,
        }
    }
}
