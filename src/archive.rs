//! ZIP packaging of a bundle's blobs for download

use crate::blobstore::BlobStore;
use crate::manifest::BundleManifest;
use crate::{Error, Result};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Download filename for a bundle archive.
pub fn archive_filename(id: &str) -> String {
    format!("bundle_{id}.zip")
}

/// Assemble a deflate-compressed ZIP of every file in the manifest, with
/// entry names equal to each entry's `bundle_path`.
///
/// The whole archive is built in memory; callers on the async side run
/// this on a blocking thread. A referenced blob that is not on disk is a
/// storage-level failure, not a client error.
pub fn build_zip(manifest: &BundleManifest, store: &BlobStore) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in &manifest.files {
        let blob_path = store.blob_path(&entry.hash);
        let content = std::fs::read(&blob_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Storage {
                    reason: format!("missing blob: {}", entry.hash),
                }
            } else {
                e.into()
            }
        })?;

        writer.start_file(entry.bundle_path.as_str(), options)?;
        writer.write_all(&content)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
