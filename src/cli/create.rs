//! Create command implementation

use crate::bundler::{self, DEFAULT_UPLOAD_CONCURRENCY};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::Result;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the create command
#[derive(Args)]
pub struct CreateArgs {
    /// Files or directories to include in the bundle
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// API server URL (overrides API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Number of parallel blob uploads
    #[arg(long, default_value_t = DEFAULT_UPLOAD_CONCURRENCY)]
    pub concurrency: usize,
}

/// Run the create command
pub async fn run(args: CreateArgs) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    let client = ApiClient::new(&config)?;

    let outcome = bundler::create_bundle(&client, &args.paths, args.concurrency).await?;

    println!("Created bundle: {}", outcome.id);
    println!("  Files: {}", outcome.file_count);
    println!("  Total size: {} bytes", outcome.total_bytes);
    println!("  Blobs uploaded: {}", outcome.uploaded);
    println!("  Merkle root: {}", outcome.merkle_root);

    Ok(())
}
