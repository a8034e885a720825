// ABOUTME: Defines the RemoteBackend trait for the hosted document store of record.
// ABOUTME: Also defines RemoteError and the always-failing client used when no remote is configured.

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A document as stored remotely: a JSON object in the backend's native encoding.
pub type Document = Map<String, Value>;

/// Failures reported by a remote backend. Every variant is recoverable by
/// falling back to local storage.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("no remote backend configured")]
    Disconnected,
}

/// A document store addressed by collection name and document key.
///
/// Timestamps may come back in whatever encoding the backend uses
/// natively; the record store normalizes them.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Insert a document and return the key the backend generated for it.
    async fn insert(&self, collection: &str, doc: Document) -> Result<String, RemoteError>;

    /// Fetch a document by key. Ok(None) means the backend answered and
    /// the document does not exist.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, RemoteError>;

    /// Create or replace the document at `key`.
    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<(), RemoteError>;

    /// Merge fields into an existing document. Fails with NotFound if the
    /// document does not exist.
    async fn update(&self, collection: &str, key: &str, fields: Document)
    -> Result<(), RemoteError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError>;

    /// Return every (key, document) pair whose `field` equals `value`.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, RemoteError>;

    /// Backend name for logging and display.
    fn backend_name(&self) -> &str;
}

/// A remote backend that rejects every call, for local-only operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl RemoteBackend for Disconnected {
    async fn insert(&self, _collection: &str, _doc: Document) -> Result<String, RemoteError> {
        Err(RemoteError::Disconnected)
    }

    async fn get(&self, _collection: &str, _key: &str) -> Result<Option<Document>, RemoteError> {
        Err(RemoteError::Disconnected)
    }

    async fn set(&self, _collection: &str, _key: &str, _doc: Document) -> Result<(), RemoteError> {
        Err(RemoteError::Disconnected)
    }

    async fn update(
        &self,
        _collection: &str,
        _key: &str,
        _fields: Document,
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Disconnected)
    }

    async fn delete(&self, _collection: &str, _key: &str) -> Result<(), RemoteError> {
        Err(RemoteError::Disconnected)
    }

    async fn query_eq(
        &self,
        _collection: &str,
        _field: &str,
        _value: &Value,
    ) -> Result<Vec<(String, Document)>, RemoteError> {
        Err(RemoteError::Disconnected)
    }

    fn backend_name(&self) -> &str {
        "disconnected"
    }
}
