// ABOUTME: Typed view of one record collection serialized under a single local storage key.
// ABOUTME: Handles owner partitions, key lookup across owners, and unreadable cache recovery.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pathwise_core::Record;

use crate::local::{LocalBackend, LocalError};

/// All locally stored records of one type, kept as a JSON array under
/// `E::LOCAL_KEY`. Every mutation is a whole-value read-modify-write.
///
/// Unreadable data (corrupt JSON, wrong shape) is treated as an empty
/// collection and is replaced by the next write.
pub struct LocalCollection<E> {
    backend: Arc<dyn LocalBackend>,
    _record: PhantomData<fn() -> E>,
}

impl<E> Clone for LocalCollection<E> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _record: PhantomData,
        }
    }
}

impl<E: Record> LocalCollection<E> {
    pub fn new(backend: Arc<dyn LocalBackend>) -> Self {
        Self {
            backend,
            _record: PhantomData,
        }
    }

    /// Read every record regardless of owner. Read failures of any kind
    /// yield an empty collection.
    pub fn load_all(&self) -> Vec<E> {
        match self.load() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("failed to read local {}: {}", E::LOCAL_KEY, e);
                Vec::new()
            }
        }
    }

    /// Records belonging to `owner`.
    pub fn list_for_owner(&self, owner: &str) -> Vec<E> {
        self.load_all()
            .into_iter()
            .filter(|r| r.owner() == owner)
            .collect()
    }

    /// Find a record by key across every owner's partition.
    pub fn find(&self, key: &str) -> Option<E> {
        self.load_all().into_iter().find(|r| r.key() == Some(key))
    }

    /// Replace everything stored for `owner` with `records`, leaving other
    /// owners' records untouched.
    pub fn replace_owner(&self, owner: &str, records: &[E]) -> Result<(), LocalError> {
        let mut all = self.load()?;
        all.retain(|r| r.owner() != owner);
        all.extend(records.iter().filter(|r| r.owner() == owner).cloned());
        self.save(&all)
    }

    /// Insert a record, replacing any stored record with the same key.
    pub fn upsert(&self, record: &E) -> Result<(), LocalError> {
        let mut all = self.load()?;
        match all
            .iter_mut()
            .find(|r| r.key().is_some() && r.key() == record.key())
        {
            Some(existing) => *existing = record.clone(),
            None => all.push(record.clone()),
        }
        self.save(&all)
    }

    /// Merge a patch into the record with `key`. When `owner` is given only
    /// that owner's partition is searched. Returns the merged record, or
    /// None if no matching record is stored.
    pub fn merge(
        &self,
        key: &str,
        owner: Option<&str>,
        patch: &E::Patch,
        now: DateTime<Utc>,
    ) -> Result<Option<E>, LocalError> {
        let mut all = self.load()?;
        let target = all
            .iter_mut()
            .find(|r| r.key() == Some(key) && owner.is_none_or(|o| r.owner() == o));

        let merged = match target {
            Some(record) => {
                record.apply_patch(patch, now);
                record.clone()
            }
            None => return Ok(None),
        };

        self.save(&all)?;
        Ok(Some(merged))
    }

    /// Remove every record with `key` from every partition. Returns whether
    /// anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool, LocalError> {
        let mut all = self.load()?;
        let before = all.len();
        all.retain(|r| r.key() != Some(key));
        if all.len() == before {
            return Ok(false);
        }
        self.save(&all)?;
        Ok(true)
    }

    /// Read the collection, propagating storage failures but treating
    /// unparseable contents as empty.
    fn load(&self) -> Result<Vec<E>, LocalError> {
        let Some(raw) = self.backend.get_item(E::LOCAL_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<E>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    "local {} is unreadable, treating as empty: {}",
                    E::LOCAL_KEY,
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, records: &[E]) -> Result<(), LocalError> {
        let json = serde_json::to_string(records)?;
        self.backend.set_item(E::LOCAL_KEY, &json)
    }
}
