// ABOUTME: Test utilities for pathwise-store, including an in-memory remote document store.
// ABOUTME: The stub stores timestamps in a native seconds/nanos encoding and can be told to fail.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use pathwise_core::{LearningPath, Record, UserSettings};
use serde_json::{Value, json};

use crate::remote::{Document, RemoteBackend, RemoteError};

/// An in-memory stand-in for the hosted document store.
///
/// RFC 3339 strings in the records' timestamp fields are stored as
/// `{"seconds", "nanos"}` objects, the way a document database converts
/// dates into its own timestamp type. `fail_all` makes every call return
/// the given error until `recover` is called.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
    failure: Mutex<Option<RemoteError>>,
    next_id: AtomicU64,
    calls: AtomicU64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `err`.
    pub fn fail_all(&self, err: RemoteError) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(err);
        }
    }

    /// Stop failing.
    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = None;
        }
    }

    /// Number of calls received, including failed ones.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// The stored (native-encoded) document at `key`, if any.
    pub fn document(&self, collection: &str, key: &str) -> Option<Document> {
        let collections = self.collections.lock().ok()?;
        collections.get(collection)?.get(key).cloned()
    }

    /// Every stored document in a collection, ordered by key.
    pub fn documents(&self, collection: &str) -> Vec<(String, Document)> {
        let Ok(collections) = self.collections.lock() else {
            return Vec::new();
        };
        collections
            .get(collection)
            .map(|docs| docs.iter().map(|(k, d)| (k.clone(), d.clone())).collect())
            .unwrap_or_default()
    }

    /// Store a document verbatim, bypassing timestamp conversion.
    pub fn put_raw(&self, collection: &str, key: &str, doc: Document) {
        if let Ok(mut collections) = self.collections.lock() {
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), doc);
        }
    }

    fn check(&self) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let failure = self
            .failure
            .lock()
            .map_err(|_| RemoteError::Backend("stub lock poisoned".to_string()))?;
        match failure.as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn with_collections<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, BTreeMap<String, Document>>) -> T,
    ) -> Result<T, RemoteError> {
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| RemoteError::Backend("stub lock poisoned".to_string()))?;
        Ok(f(&mut collections))
    }
}

/// Whether a document field holds a point in time for any stored record type.
fn is_timestamp_field(field: &str) -> bool {
    LearningPath::TIMESTAMP_FIELDS.contains(&field)
        || UserSettings::TIMESTAMP_FIELDS.contains(&field)
}

fn to_native(doc: Document) -> Document {
    doc.into_iter()
        .map(|(field, value)| {
            if !is_timestamp_field(&field) {
                return (field, value);
            }
            let native = match value {
                Value::String(s) => match DateTime::parse_from_rfc3339(&s) {
                    Ok(dt) => json!({
                        "seconds": dt.timestamp(),
                        "nanos": dt.timestamp_subsec_nanos(),
                    }),
                    Err(_) => Value::String(s),
                },
                other => other,
            };
            (field, native)
        })
        .collect()
}

#[async_trait]
impl RemoteBackend for MemoryRemote {
    async fn insert(&self, collection: &str, doc: Document) -> Result<String, RemoteError> {
        self.check()?;
        let key = format!("doc-{:06}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let stored = key.clone();
        self.with_collections(|c| {
            c.entry(collection.to_string())
                .or_default()
                .insert(stored, to_native(doc));
        })?;
        Ok(key)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, RemoteError> {
        self.check()?;
        self.with_collections(|c| c.get(collection).and_then(|docs| docs.get(key)).cloned())
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<(), RemoteError> {
        self.check()?;
        self.with_collections(|c| {
            c.entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), to_native(doc));
        })
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
    ) -> Result<(), RemoteError> {
        self.check()?;
        self.with_collections(|c| {
            let existing = c
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(key))
                .ok_or_else(|| RemoteError::NotFound(format!("{}/{}", collection, key)))?;
            existing.extend(to_native(fields));
            Ok(())
        })?
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), RemoteError> {
        self.check()?;
        self.with_collections(|c| {
            if let Some(docs) = c.get_mut(collection) {
                docs.remove(key);
            }
        })
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, RemoteError> {
        self.check()?;
        self.with_collections(|c| {
            c.get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|(_, doc)| doc.get(field) == Some(value))
                        .map(|(k, d)| (k.clone(), d.clone()))
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
