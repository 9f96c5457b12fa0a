//! A `redb`-backed implementation of `raconteur_traits::ports::RemoteCachePort`.
//!
//! Values are stored as a small JSON envelope carrying an optional absolute
//! expiry so a single byte-oriented KV table can serve both plain gets/sets
//! and TTL'd entries without a second table. Expired entries are pruned
//! lazily on read (the bounded in-memory fallback in
//! `SessionContinuityCache` evicts FIFO instead; this store only needs to
//! stop returning stale values, not reclaim space eagerly).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use raconteur_traits::error::{Result as PortResult, ToolError};
use raconteur_traits::ports::RemoteCachePort;
use redb::Database;
use serde::{Deserialize, Serialize};

use crate::KvStoreStorage;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SetEnvelope {
    members: Vec<String>,
}

/// Remote cache port backed by a single `redb` KV table.
pub struct RedbRemoteCache {
    store: KvStoreStorage,
}

impl RedbRemoteCache {
    pub fn new(db: Arc<Database>) -> anyhow::Result<Self> {
        Ok(Self {
            store: KvStoreStorage::new(db)?,
        })
    }

    pub fn from_storage(storage: &crate::Storage) -> Self {
        Self {
            store: storage.kv.clone(),
        }
    }

    fn set_key(key: &str) -> String {
        format!("__set__:{key}")
    }
}

fn map_err(e: anyhow::Error) -> ToolError {
    ToolError::Other(e)
}

#[async_trait]
impl RemoteCachePort for RedbRemoteCache {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        let raw = self.store.get_raw(key).map_err(map_err)?;
        let Some(bytes) = raw else {
            return Ok(None);
        };
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if let Some(expires_at) = envelope.expires_at
            && expires_at <= Utc::now()
        {
            let _ = self.store.delete(key);
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> PortResult<()> {
        let expires_at = ttl.and_then(|d| chrono::Duration::from_std(d).ok()).map(|d| Utc::now() + d);
        let envelope = Envelope {
            value: value.to_string(),
            expires_at,
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.store.put_raw(key, &bytes).map_err(map_err)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> PortResult<()> {
        self.store.delete(key).map_err(map_err)?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> PortResult<()> {
        let Some(bytes) = self.store.get_raw(key).map_err(map_err)? else {
            return Ok(());
        };
        let mut envelope: Envelope = serde_json::from_slice(&bytes)?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ToolError::Other(anyhow::anyhow!("{e}")))?;
        envelope.expires_at = Some(Utc::now() + ttl);
        let bytes = serde_json::to_vec(&envelope)?;
        self.store.put_raw(key, &bytes).map_err(map_err)?;
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str) -> PortResult<()> {
        let set_key = Self::set_key(key);
        let mut envelope = match self.store.get_raw(&set_key).map_err(map_err)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => SetEnvelope::default(),
        };
        if !envelope.members.iter().any(|m| m == member) {
            envelope.members.push(member.to_string());
        }
        let bytes = serde_json::to_vec(&envelope)?;
        self.store.put_raw(&set_key, &bytes).map_err(map_err)?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> PortResult<Vec<String>> {
        let set_key = Self::set_key(key);
        let envelope: SetEnvelope = match self.store.get_raw(&set_key).map_err(map_err)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => return Ok(Vec::new()),
        };
        Ok(envelope.members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use tempfile::NamedTempFile;

    fn open() -> RedbRemoteCache {
        let file = NamedTempFile::new().unwrap();
        let db = Arc::new(Database::create(file.path()).unwrap());
        RedbRemoteCache::new(db).unwrap()
    }

    #[tokio::test]
    async fn round_trips_scalar_values() {
        let cache = open();
        assert_eq!(cache.get("k").await.unwrap(), None);
        cache.set("k", "v", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        cache.del("k").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_read_back_as_absent() {
        let cache = open();
        cache
            .set("k", "v", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_members_accumulate_without_duplicates() {
        let cache = open();
        cache.set_add("topics:u1", "travel").await.unwrap();
        cache.set_add("topics:u1", "family").await.unwrap();
        cache.set_add("topics:u1", "travel").await.unwrap();
        let mut members = cache.set_members("topics:u1").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["family".to_string(), "travel".to_string()]);
    }
}
