//! Download command implementation
//!
//! The archive streams into a dot-prefixed temp file next to the final
//! destination and is renamed into place once complete, so an aborted
//! download never leaves a half-written archive under the final name.

use crate::archive::archive_filename;
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::{Error, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Arguments for the download command
#[derive(Args)]
pub struct DownloadArgs {
    /// ID of the bundle to download
    pub bundle_id: String,

    /// Archive format
    #[arg(long, default_value = "zip")]
    pub format: String,

    /// Directory to write the archive into
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// API server URL (overrides API_URL)
    #[arg(long)]
    pub api_url: Option<String>,
}

/// Run the download command
pub async fn run(args: DownloadArgs) -> Result<()> {
    if args.format != "zip" {
        return Err(Error::UnsupportedFormat {
            format: args.format,
        });
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    let client = ApiClient::new(&config)?;

    let final_path = conflict_free_path(&args.output_dir.join(archive_filename(&args.bundle_id)));
    let tmp_path = args.output_dir.join(format!(
        ".{}.{}.tmp",
        final_path
            .file_name()
            .expect("archive name is non-empty")
            .to_string_lossy(),
        Uuid::new_v4()
    ));

    let response = client.download_bundle(&args.bundle_id, &args.format).await?;

    match write_stream(response, &tmp_path).await {
        Ok(total_bytes) => {
            tokio::fs::rename(&tmp_path, &final_path).await?;
            println!(
                "Downloaded {} ({} bytes)",
                final_path.display(),
                total_bytes
            );
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            Err(e)
        }
    }
}

async fn write_stream(mut response: reqwest::Response, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut total_bytes: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        total_bytes += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(total_bytes)
}

/// First free destination: the name itself, else `.1`, `.2`, ... before
/// the extension.
fn conflict_free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut counter = 1;
    loop {
        let candidate = if extension.is_empty() {
            parent.join(format!("{stem}.{counter}"))
        } else {
            parent.join(format!("{stem}.{counter}.{extension}"))
        };
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_conflict_free_path_picks_first_free_suffix() -> crate::Result<()> {
        let dir = TempDir::new()?;
        let target = dir.path().join("bundle_abc.zip");

        assert_eq!(conflict_free_path(&target), target);

        std::fs::write(&target, b"taken")?;
        assert_eq!(
            conflict_free_path(&target),
            dir.path().join("bundle_abc.1.zip")
        );

        std::fs::write(dir.path().join("bundle_abc.1.zip"), b"also taken")?;
        assert_eq!(
            conflict_free_path(&target),
            dir.path().join("bundle_abc.2.zip")
        );
        Ok(())
    }
}
