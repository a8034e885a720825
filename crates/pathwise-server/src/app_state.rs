// ABOUTME: Shared application state for the PathWise HTTP server.
// ABOUTME: Holds one record store per entity, both wired to the same backends and fallback signal.

use std::sync::Arc;

use pathwise_store::{
    Disconnected, FallbackSignal, FileLocal, HttpRemote, LocalBackend, LocalError, MemoryLocal,
    PathStore, RemoteBackend, SettingsStore, SqliteLocal,
};

use crate::config::{LocalBackendKind, PathwiseConfig};

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub paths: PathStore,
    pub settings: SettingsStore,
    pub signal: FallbackSignal,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build both stores over the given backends.
    pub fn new(remote: Arc<dyn RemoteBackend>, local: Arc<dyn LocalBackend>) -> Self {
        let signal = FallbackSignal::new();
        Self {
            paths: PathStore::with_signal(remote.clone(), local.clone(), signal.clone()),
            settings: SettingsStore::with_signal(remote, local, signal.clone()),
            signal,
        }
    }

    /// Open the backends named by the configuration. Without a remote URL
    /// every operation is served from local storage.
    pub fn from_config(config: &PathwiseConfig) -> Result<Self, LocalError> {
        let remote: Arc<dyn RemoteBackend> = match &config.remote_url {
            Some(url) => {
                tracing::info!("using remote document store at {}", url);
                Arc::new(HttpRemote::new(url.clone(), config.remote_token.clone()))
            }
            None => {
                tracing::info!("no remote configured, serving from local storage only");
                Arc::new(Disconnected)
            }
        };

        let local: Arc<dyn LocalBackend> = match config.local_backend {
            LocalBackendKind::Sqlite => {
                Arc::new(SqliteLocal::open(&config.home.join("pathwise.db"))?)
            }
            LocalBackendKind::File => Arc::new(FileLocal::open(&config.home.join("local"))?),
            LocalBackendKind::Memory => Arc::new(MemoryLocal::new()),
        };
        tracing::info!(
            "local fallback: {:?} under {}",
            config.local_backend,
            config.home.display()
        );

        Ok(Self::new(remote, local))
    }

    pub fn using_local_fallback(&self) -> bool {
        self.signal.is_active()
    }
}
