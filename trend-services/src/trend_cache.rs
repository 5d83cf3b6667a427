//! Snapshot store for serialized ranking results
//!
//! A small key-value store of JSON payloads. Entries are written either with
//! a TTL or without expiry; expired entries read as absent.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use trend_core::TrendError;

struct StoredValue {
    payload: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| Instant::now() >= at)
            .unwrap_or(false)
    }
}

/// In-memory store of serialized values
#[derive(Default)]
pub struct SnapshotStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payload for `key`, `None` when missing or expired
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|v| !v.is_expired())
            .map(|v| v.payload.clone())
    }

    /// Store a payload that expires after `ttl`
    pub fn set_with_ttl(&self, key: &str, payload: String, ttl: Duration) {
        let purged = self.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired snapshot entries", purged);
        }
        self.entries.write().insert(
            key.to_string(),
            StoredValue {
                payload,
                expires_at: Some(Instant::now() + ttl),
            },
        );
    }

    /// Store a payload without expiry
    pub fn set(&self, key: &str, payload: String) {
        self.entries.write().insert(
            key.to_string(),
            StoredValue {
                payload,
                expires_at: None,
            },
        );
    }

    /// Deserialize the value at `key`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key) {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it, with expiry when `ttl` is given
    pub fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        match ttl {
            Some(ttl) => self.set_with_ttl(key, payload, ttl),
            None => self.set(key, payload),
        }
        debug!("Stored snapshot entry {}", key);
        Ok(())
    }

    /// Drop expired entries
    fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, v| !v.is_expired());
        before - entries.len()
    }
}

/// Errors that can occur when reading or writing snapshots
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CacheError> for TrendError {
    fn from(err: CacheError) -> Self {
        TrendError::cache(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ttl_entry_expires() {
        let store = SnapshotStore::new();
        store.set_with_ttl("k", "v".to_string(), Duration::from_secs(60));
        store.set("snap", "s".to_string());

        assert_eq!(store.get("k").as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.get("k"), None);
        assert_eq!(store.get("snap").as_deref(), Some("s"));
        assert_eq!(store.purge_expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_write_drops_expired_entries() {
        let store = SnapshotStore::new();
        store.set_with_ttl("old", "v".to_string(), Duration::from_secs(5));
        store.set("snap", "s".to_string());

        tokio::time::advance(Duration::from_secs(6)).await;
        store.set_with_ttl("new", "w".to_string(), Duration::from_secs(5));

        assert_eq!(store.entries.read().len(), 2);
        assert!(!store.entries.read().contains_key("old"));
        assert_eq!(store.get("new").as_deref(), Some("w"));
    }

    #[test]
    fn test_json_round_trip_and_bad_payload() {
        let store = SnapshotStore::new();
        store.set_json("nums", &vec![1, 2, 3], None).unwrap();
        assert_eq!(store.get_json::<Vec<i32>>("nums").unwrap(), Some(vec![1, 2, 3]));

        store.set("bad", "{not json".to_string());
        assert!(store.get_json::<Vec<i32>>("bad").is_err());
        assert!(store.get_json::<Vec<i32>>("missing").unwrap().is_none());
    }
}
