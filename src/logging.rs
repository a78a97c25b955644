//! Logging setup shared by the server and client binaries

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// filter when set.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "packstore=debug,tower_http=debug"
    } else {
        "packstore=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
