//! List command implementation

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::Result;
use clap::Args;

/// Arguments for the list command
#[derive(Args)]
pub struct ListArgs {
    /// API server URL (overrides API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Page to fetch (1-based)
    #[arg(long)]
    pub page: Option<usize>,

    /// Summaries per page
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Run the list command
pub async fn run(args: ListArgs) -> Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config.api_url = url;
    }
    let client = ApiClient::new(&config)?;

    let bundles = client.list_bundles(args.page, args.page_size).await?;

    if bundles.is_empty() {
        println!("No bundles found.");
        return Ok(());
    }

    println!(
        "{:<28} {:<22} {:>7} {:>12}  {}",
        "ID", "CREATED", "FILES", "SIZE", "MERKLE ROOT"
    );
    for bundle in bundles {
        println!(
            "{:<28} {:<22} {:>7} {:>12}  {}",
            bundle.id,
            bundle.created_at,
            bundle.file_count,
            format_bytes(bundle.total_bytes),
            &bundle.merkle_root[..12],
        );
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
