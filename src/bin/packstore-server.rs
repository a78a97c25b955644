//! packstore-server - content-addressed bundle store server
//!
//! Serves the blob and bundle API over HTTP. Configuration comes from
//! the environment (DATA_DIR, MAX_UPLOAD_BYTES, LISTEN_ADDR,
//! REQUEST_TIMEOUT), with flags taking precedence.

use anyhow::Context;
use clap::Parser;
use packstore::config::ServerConfig;
use packstore::logging::init_logging;
use std::net::SocketAddr;
use std::path::PathBuf;

/// packstore API server
#[derive(Parser)]
#[command(name = "packstore-server")]
#[command(about = "Content-addressed bundle store server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct ServerCli {
    /// Data root directory (overrides DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Address to listen on (overrides LISTEN_ADDR)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ServerCli::parse();
    init_logging(cli.verbose);

    let mut config = ServerConfig::from_env().context("failed to read server configuration")?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    packstore::server::serve(config)
        .await
        .context("server exited with an error")
}
