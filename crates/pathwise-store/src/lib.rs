// ABOUTME: Persistence layer for PathWise, preferring a remote document store with a local fallback.
// ABOUTME: Provides the remote and local backend traits, their adapters, and the record store engine.

pub mod collection;
pub mod http;
pub mod local;
pub mod paths;
pub mod remote;
pub mod settings;
pub mod sqlite;
pub mod store;
pub mod testing;

pub use collection::LocalCollection;
pub use http::HttpRemote;
pub use local::{FileLocal, LocalBackend, LocalError, MemoryLocal};
pub use paths::PathStore;
pub use remote::{Disconnected, Document, RemoteBackend, RemoteError};
pub use reqwest::Url;
pub use settings::SettingsStore;
pub use sqlite::SqliteLocal;
pub use store::{FallbackSignal, Outcome, RecordStore, Source, StoreError};
