//! Command-line interface for the bundle store client
//!
//! One module per subcommand, each exposing an `Args` struct and an
//! async `run` entry point.

use clap::{Parser, Subcommand};

pub mod create;
pub mod download;
pub mod list;

/// packstore - content-addressed bundle store client
#[derive(Parser)]
#[command(name = "packstore")]
#[command(about = "Upload, list and download content-addressed bundles")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Create a bundle from local files and directories
    Create(create::CreateArgs),
    /// List bundles on the server
    List(list::ListArgs),
    /// Download a bundle as an archive
    Download(download::DownloadArgs),
}
