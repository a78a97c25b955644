//! Runtime configuration resolved from environment variables at startup

use crate::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default cap on a single blob upload (1 GiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1024 * 1024 * 1024;

/// Default number of summaries per listing page
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Default request deadline on both sides, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Server-side configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root directory owning blobs, bundles and upload staging
    pub data_dir: PathBuf,
    /// Largest accepted blob, enforced before any body bytes are read
    pub max_upload_bytes: u64,
    /// Socket address to listen on
    pub listen_addr: SocketAddr,
    /// Outer deadline applied to every request
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".data"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            listen_addr: "127.0.0.1:8000".parse().expect("valid default address"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Resolve the server configuration from `DATA_DIR`, `MAX_UPLOAD_BYTES`,
    /// `LISTEN_ADDR` and `REQUEST_TIMEOUT`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(max) = parse_env("MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = max;
        }
        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            config.listen_addr = addr.parse().map_err(|_| Error::Configuration {
                reason: format!("LISTEN_ADDR is not a socket address: {addr}"),
            })?;
        }
        if let Some(secs) = parse_env("REQUEST_TIMEOUT")? {
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Client-side configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API server
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Resolve the client configuration from `API_URL` and `API_TIMEOUT`
    /// (seconds), falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("API_URL") {
            config.api_url = url;
        }
        if let Some(secs) = parse_env("API_TIMEOUT")? {
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_env(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::Configuration {
                reason: format!("{name} must be a non-negative integer, got '{value}'"),
            }),
        Err(_) => Ok(None),
    }
}
