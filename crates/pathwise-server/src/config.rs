// ABOUTME: Configuration loading and validation for the PathWise server.
// ABOUTME: Reads PATHWISE_* environment variables and picks the remote and local backends.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use pathwise_store::Url;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PATHWISE_BIND is not a valid socket address: {0}")]
    InvalidBind(String),

    #[error("PATHWISE_REMOTE_URL is not a valid URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("PATHWISE_LOCAL_BACKEND must be one of sqlite, file, memory; got {0}")]
    InvalidLocalBackend(String),
}

/// Where local fallback data is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalBackendKind {
    /// A SQLite key/value table at `{home}/pathwise.db`.
    #[default]
    Sqlite,
    /// One JSON file per key under `{home}/local`.
    File,
    /// Process memory only; nothing survives a restart.
    Memory,
}

impl FromStr for LocalBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidLocalBackend(s.to_string())),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PathwiseConfig {
    pub home: PathBuf,
    pub bind: SocketAddr,
    pub remote_url: Option<Url>,
    pub remote_token: Option<String>,
    pub local_backend: LocalBackendKind,
}

impl PathwiseConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - PATHWISE_HOME: data directory (default: ~/.pathwise)
    /// - PATHWISE_BIND: socket address to bind (default: 127.0.0.1:7341)
    /// - PATHWISE_REMOTE_URL: base URL of the document service (optional;
    ///   when unset every operation is served locally)
    /// - PATHWISE_REMOTE_TOKEN: bearer token for the document service (optional)
    /// - PATHWISE_LOCAL_BACKEND: sqlite, file, or memory (default: sqlite)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Empty
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let home = var("PATHWISE_HOME").map(PathBuf::from).unwrap_or_else(|| {
            var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".pathwise")
        });

        let bind_str = var("PATHWISE_BIND").unwrap_or_else(|| "127.0.0.1:7341".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let remote_url = var("PATHWISE_REMOTE_URL")
            .map(|raw| Url::parse(&raw).map_err(|_| ConfigError::InvalidRemoteUrl(raw)))
            .transpose()?;

        let remote_token = var("PATHWISE_REMOTE_TOKEN");

        let local_backend = var("PATHWISE_LOCAL_BACKEND")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            home,
            bind,
            remote_url,
            remote_token,
            local_backend,
        })
    }
}
