//! packstore - content-addressed bundle store client
//!
//! Main binary entry point for the command-line interface.

use clap::Parser;
use packstore::cli::{Cli, Commands};
use packstore::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Create(args) => packstore::cli::create::run(args).await,
        Commands::List(args) => packstore::cli::list::run(args).await,
        Commands::Download(args) => packstore::cli::download::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
