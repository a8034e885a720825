// ABOUTME: The Record trait that lets one storage engine serve every owned entity type.
// ABOUTME: Describes where a record lives, how it is keyed and owned, and how partial updates merge.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// An owner-partitioned record that can be persisted to both the remote
/// document store and the local key/value fallback.
///
/// The serialized form is shared by both backends, so field names must be
/// stable. Timestamp fields are listed in `TIMESTAMP_FIELDS` so documents
/// coming back from the remote can be normalized before deserializing.
pub trait Record: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Every-field-optional variant used for merges.
    type Patch: Clone + Debug + Serialize + Send + Sync + 'static;

    /// Remote collection name.
    const COLLECTION: &'static str;

    /// Local backend key under which the whole collection is stored.
    const LOCAL_KEY: &'static str;

    /// Document field that carries the record key.
    const KEY_FIELD: &'static str;

    /// Document field that carries the owner id.
    const OWNER_FIELD: &'static str = "userId";

    /// Document fields holding points in time.
    const TIMESTAMP_FIELDS: &'static [&'static str];

    /// The record key, if one has been assigned. Records with a natural key
    /// always return Some.
    fn key(&self) -> Option<&str>;

    fn assign_key(&mut self, key: String);

    /// The owning user's identifier.
    fn owner(&self) -> &str;

    /// Set both creation and update timestamps.
    fn stamp_created(&mut self, now: DateTime<Utc>);

    /// Merge a patch into this record and set the update timestamp.
    fn apply_patch(&mut self, patch: &Self::Patch, now: DateTime<Utc>);

    /// The owner named by a patch, if the caller supplied one.
    fn patch_owner(patch: &Self::Patch) -> Option<&str>;
}
