// ABOUTME: The remote-first record store: one engine parameterized over the Record trait.
// ABOUTME: Falls back to local storage on remote failure and mirrors remote writes into local storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use pathwise_core::{Record, mint_local_key, normalize_document};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::collection::LocalCollection;
use crate::local::{LocalBackend, LocalError};
use crate::remote::{Document, RemoteBackend, RemoteError};

/// Which backend served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remote,
    Local,
}

/// The result of a store operation together with the backend that served it.
/// `Source::Local` is the "saved locally due to a backend issue" signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Outcome<T> {
    pub fn remote(value: T) -> Self {
        Self {
            value,
            source: Source::Remote,
        }
    }

    pub fn local(value: T) -> Self {
        Self {
            value,
            source: Source::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.source == Source::Local
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            source: self.source,
        }
    }
}

/// Failures the store cannot absorb by falling back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("local storage error: {0}")]
    Local(#[from] LocalError),

    #[error("record encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Shared flag reporting whether the most recent operation on any store
/// holding it fell back to local storage.
#[derive(Debug, Clone, Default)]
pub struct FallbackSignal(Arc<AtomicBool>);

impl FallbackSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, active: bool) {
        self.0.store(active, Ordering::Relaxed);
    }
}

/// A persistence façade over a remote document store and a local
/// key/value fallback for one record type.
///
/// Every operation tries the remote backend exactly once. Remote failures
/// of any kind send the operation to local storage instead; successful
/// remote operations are mirrored into local storage so it stays warm.
/// Records created while the remote is unavailable stay local-only.
pub struct RecordStore<E> {
    pub(crate) remote: Arc<dyn RemoteBackend>,
    pub(crate) local: LocalCollection<E>,
    signal: FallbackSignal,
}

impl<E> Clone for RecordStore<E> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            local: self.local.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<E: Record> RecordStore<E> {
    pub fn new(remote: Arc<dyn RemoteBackend>, local: Arc<dyn LocalBackend>) -> Self {
        Self::with_signal(remote, local, FallbackSignal::new())
    }

    /// Create a store that reports fallbacks through a shared signal.
    pub fn with_signal(
        remote: Arc<dyn RemoteBackend>,
        local: Arc<dyn LocalBackend>,
        signal: FallbackSignal,
    ) -> Self {
        Self {
            remote,
            local: LocalCollection::new(local),
            signal,
        }
    }

    /// Whether the most recent operation fell back to local storage.
    pub fn is_using_fallback(&self) -> bool {
        self.signal.is_active()
    }

    /// All records owned by `owner`. Never fails: when the remote is
    /// unavailable the local copy is returned, possibly empty. Order is
    /// unspecified.
    pub async fn list_by_owner(&self, owner: &str) -> Outcome<Vec<E>> {
        let owner_value = Value::String(owner.to_string());
        match self
            .remote
            .query_eq(E::COLLECTION, E::OWNER_FIELD, &owner_value)
            .await
        {
            Ok(docs) => {
                let records: Vec<E> = docs
                    .into_iter()
                    .filter_map(|(key, doc)| match decode::<E>(&key, doc) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::warn!("skipping remote {}/{}: {}", E::COLLECTION, key, e);
                            None
                        }
                    })
                    .filter(|record| record.owner() == owner)
                    .collect();

                if let Err(e) = self.local.replace_owner(owner, &records) {
                    tracing::warn!("failed to mirror {} for {}: {}", E::COLLECTION, owner, e);
                }
                self.remote_ok();
                Outcome::remote(records)
            }
            Err(e) => {
                self.fall_back("list", &e);
                Outcome::local(self.local.list_for_owner(owner))
            }
        }
    }

    /// Read one record by key. A record the remote does not know about is
    /// still returned from local storage, marked as local, since it may have
    /// been created while the remote was unavailable.
    pub async fn get(&self, key: &str) -> Outcome<Option<E>> {
        let fetched = match self.remote.get(E::COLLECTION, key).await {
            Ok(Some(doc)) => decode::<E>(key, doc).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match fetched {
            Ok(Some(record)) => {
                self.mirror(&record);
                self.remote_ok();
                Outcome::remote(Some(record))
            }
            Ok(None) => {
                self.remote_ok();
                match self.local.find(key) {
                    Some(record) => Outcome::local(Some(record)),
                    None => Outcome::remote(None),
                }
            }
            Err(e) => {
                self.fall_back("get", &e);
                Outcome::local(self.local.find(key))
            }
        }
    }

    /// Persist a new record and return its key. Records without a natural
    /// key get one from the remote, or a local-origin key when the remote
    /// is unavailable.
    pub async fn create(&self, record: E) -> Result<Outcome<String>, StoreError> {
        let stored = self.put(record).await?;
        Ok(stored.map(|record| record.key().unwrap_or_default().to_string()))
    }

    /// Merge `patch` into the record at `key`.
    ///
    /// If the remote is unavailable the merge is applied to the local copy,
    /// located through the owner named in the patch or, failing that, by
    /// searching every owner's records. Fails with NotFound only when the
    /// remote is unavailable and no local copy exists. A remote that answers
    /// NotFound is still healthy, so only the local copy is tried and the
    /// fallback signal is cleared rather than raised.
    pub async fn update(&self, key: &str, patch: &E::Patch) -> Result<Outcome<()>, StoreError> {
        let now = Utc::now();
        let mut fields = to_document(patch)?;
        fields.insert("updatedAt".to_string(), Value::String(timestamp_string(now)));

        match self.remote.update(E::COLLECTION, key, fields).await {
            Ok(()) => {
                match self.local.merge(key, None, patch, now) {
                    Ok(Some(_)) => tracing::debug!("mirrored update of {}/{}", E::COLLECTION, key),
                    Ok(None) => tracing::debug!("no local copy of {}/{} to mirror", E::COLLECTION, key),
                    Err(e) => tracing::warn!("failed to mirror update of {}/{}: {}", E::COLLECTION, key, e),
                }
                self.remote_ok();
                Ok(Outcome::remote(()))
            }
            Err(RemoteError::NotFound(_)) => {
                // The remote answered; the record just isn't there.
                tracing::debug!("{}/{} not on remote, trying local copy", E::COLLECTION, key);
                self.remote_ok();
                match self.local.merge(key, E::patch_owner(patch), patch, now)? {
                    Some(_) => Ok(Outcome::local(())),
                    None => Err(StoreError::NotFound(key.to_string())),
                }
            }
            Err(e) => {
                self.fall_back("update", &e);
                match self.local.merge(key, E::patch_owner(patch), patch, now)? {
                    Some(_) => Ok(Outcome::local(())),
                    None => Err(StoreError::NotFound(key.to_string())),
                }
            }
        }
    }

    /// Delete the record at `key` from both backends. Deleting a missing
    /// key is not an error. Local removal happens whatever the remote said.
    pub async fn delete(&self, key: &str) -> Result<Outcome<()>, StoreError> {
        let remote = self.remote.delete(E::COLLECTION, key).await;
        let local = self.local.remove(key);

        match (remote, local) {
            (Ok(()), Ok(_)) => {
                self.remote_ok();
                Ok(Outcome::remote(()))
            }
            (Ok(()), Err(e)) => {
                tracing::warn!("failed to remove local copy of {}/{}: {}", E::COLLECTION, key, e);
                self.remote_ok();
                Ok(Outcome::remote(()))
            }
            (Err(e), Ok(removed)) => {
                self.fall_back("delete", &e);
                if !removed {
                    tracing::debug!("{}/{} was not stored locally", E::COLLECTION, key);
                }
                Ok(Outcome::local(()))
            }
            (Err(e), Err(local_err)) => {
                self.fall_back("delete", &e);
                Err(local_err.into())
            }
        }
    }

    /// Write a complete record, stamping creation times. Natural-keyed
    /// records are set by key; others are inserted and receive a key.
    pub(crate) async fn put(&self, mut record: E) -> Result<Outcome<E>, StoreError> {
        record.stamp_created(Utc::now());
        let doc = to_document(&record)?;

        let written = match record.key() {
            Some(key) => {
                let key = key.to_string();
                self.remote
                    .set(E::COLLECTION, &key, doc)
                    .await
                    .map(|()| key)
            }
            None => self.remote.insert(E::COLLECTION, doc).await,
        };

        match written {
            Ok(key) => {
                record.assign_key(key);
                self.mirror(&record);
                self.remote_ok();
                Ok(Outcome::remote(record))
            }
            Err(e) => {
                self.fall_back("create", &e);
                if record.key().is_none() {
                    record.assign_key(mint_local_key());
                }
                self.local.upsert(&record)?;
                Ok(Outcome::local(record))
            }
        }
    }

    /// Copy a record the remote accepted into local storage.
    pub(crate) fn mirror(&self, record: &E) {
        if let Err(e) = self.local.upsert(record) {
            tracing::warn!(
                "failed to mirror {}/{}: {}",
                E::COLLECTION,
                record.key().unwrap_or_default(),
                e
            );
        }
    }

    pub(crate) fn fall_back(&self, op: &str, err: &RemoteError) {
        tracing::warn!(
            "remote {} on {} via {} failed, using local storage: {}",
            op,
            E::COLLECTION,
            self.remote.backend_name(),
            err
        );
        self.signal.set(true);
    }

    pub(crate) fn remote_ok(&self) {
        self.signal.set(false);
    }
}

/// Turn a remote document into a typed record: normalize its timestamps
/// and attach the key the backend stores it under.
pub(crate) fn decode<E: Record>(key: &str, mut doc: Document) -> Result<E, RemoteError> {
    let unreadable = normalize_document(&mut doc, E::TIMESTAMP_FIELDS);
    if !unreadable.is_empty() {
        return Err(RemoteError::Malformed(format!(
            "{}/{} has unreadable timestamps: {}",
            E::COLLECTION,
            key,
            unreadable.join(", ")
        )));
    }
    doc.insert(E::KEY_FIELD.to_string(), Value::String(key.to_string()));
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| RemoteError::Malformed(format!("{}/{}: {}", E::COLLECTION, key, e)))
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Encode(<serde_json::Error as serde::ser::Error>::custom(
            format!("expected a JSON object, got {}", other),
        ))),
    }
}

fn timestamp_string(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
