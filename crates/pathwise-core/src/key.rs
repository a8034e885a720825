// ABOUTME: Record key minting for records that only the local backend has accepted.
// ABOUTME: Local-origin keys carry a fixed prefix so callers can tell which backend holds a record.

use ulid::Ulid;

/// Prefix marking a key minted by the local fallback rather than the remote store.
pub const LOCAL_KEY_PREFIX: &str = "local-";

/// Mint a fresh local-origin key. The ULID suffix combines the current
/// time with 80 bits of randomness.
pub fn mint_local_key() -> String {
    format!("{}{}", LOCAL_KEY_PREFIX, Ulid::new())
}

/// Whether a key was minted by the local fallback.
pub fn is_local_key(key: &str) -> bool {
    key.strip_prefix(LOCAL_KEY_PREFIX)
        .is_some_and(|suffix| !suffix.is_empty())
}
