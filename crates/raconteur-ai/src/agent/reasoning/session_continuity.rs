//! Session continuity cache (§4.9): a two-tier cache (remote-first, local
//! in-memory fallback) for recent-turn recall and per-user topic tracking
//! across sessions.
//!
//! Grounded on `raconteur_traits::ports::RemoteCachePort` (this workspace's
//! own new port, §6) for the remote tier and on `cache::search_cache`'s
//! capped-map-with-eviction idiom for the local fallback tier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use raconteur_traits::ports::RemoteCachePort;
use serde::{Deserialize, Serialize};

const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const TOPIC_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const MAX_LOCAL_SESSIONS: usize = 1000;
const MAX_TOPICS_PER_USER: usize = 100;
const MAX_TOPIC_USERS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub user_id: String,
    pub last_turns: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

struct LocalEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

struct LocalTopicSet {
    members: Vec<String>,
    expires_at: DateTime<Utc>,
}

/// Local in-memory fallback tier, used when the remote cache is
/// unavailable.
#[derive(Default)]
struct LocalTier {
    sessions: HashMap<String, LocalEntry>,
    topics: HashMap<String, LocalTopicSet>,
}

impl LocalTier {
    fn set(&mut self, key: &str, value: &str, ttl: Duration, now: DateTime<Utc>) {
        if self.sessions.len() >= MAX_LOCAL_SESSIONS && !self.sessions.contains_key(key) {
            if let Some(oldest_key) = self
                .sessions
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(k, _)| k.clone())
            {
                self.sessions.remove(&oldest_key);
            }
        }
        self.sessions.insert(
            key.to_string(),
            LocalEntry {
                value: value.to_string(),
                expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
            },
        );
    }

    fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<String> {
        let expired = self.sessions.get(key).is_some_and(|e| e.expires_at <= now);
        if expired {
            self.sessions.remove(key);
            return None;
        }
        self.sessions.get(key).map(|e| e.value.clone())
    }

    fn del(&mut self, key: &str) {
        self.sessions.remove(key);
    }

    fn topic_add(&mut self, key: &str, member: &str, now: DateTime<Utc>) {
        if self.topics.len() >= MAX_TOPIC_USERS && !self.topics.contains_key(key) {
            if let Some(oldest_key) = self
                .topics
                .iter()
                .min_by_key(|(_, set)| set.expires_at)
                .map(|(k, _)| k.clone())
            {
                self.topics.remove(&oldest_key);
            }
        }
        let set = self.topics.entry(key.to_string()).or_insert_with(|| LocalTopicSet {
            members: Vec::new(),
            expires_at: now + chrono::Duration::from_std(TOPIC_TTL).unwrap_or_default(),
        });
        if !set.members.contains(&member.to_string()) {
            set.members.push(member.to_string());
        }
        while set.members.len() > MAX_TOPICS_PER_USER {
            set.members.remove(0);
        }
        set.expires_at = now + chrono::Duration::from_std(TOPIC_TTL).unwrap_or_default();
    }

    fn topic_members(&mut self, key: &str, now: DateTime<Utc>) -> Vec<String> {
        let expired = self.topics.get(key).is_some_and(|s| s.expires_at <= now);
        if expired {
            self.topics.remove(key);
            return Vec::new();
        }
        self.topics.get(key).map(|s| s.members.clone()).unwrap_or_default()
    }
}

fn session_key(user_id: &str, session_id: &str) -> String {
    format!("session:{user_id}:{session_id}")
}

fn topic_key(user_id: &str) -> String {
    format!("topics:{user_id}")
}

/// Two-tier session continuity cache. Tries the remote cache first; on any
/// remote failure, flips `redis_available` false for the remainder of the
/// process and falls back to the local in-memory tier for all subsequent
/// calls (matching the "fail open to local, don't retry every call"
/// behavior of the spec).
pub struct SessionContinuityCache {
    remote: Option<Arc<dyn RemoteCachePort>>,
    redis_available: std::sync::atomic::AtomicBool,
    local: Mutex<LocalTier>,
}

impl SessionContinuityCache {
    pub fn new(remote: Option<Arc<dyn RemoteCachePort>>) -> Self {
        Self {
            redis_available: std::sync::atomic::AtomicBool::new(remote.is_some()),
            remote,
            local: Mutex::new(LocalTier::default()),
        }
    }

    pub fn local_only() -> Self {
        Self::new(None)
    }

    fn remote_is_usable(&self) -> bool {
        self.remote.is_some() && self.redis_available.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn mark_remote_unavailable(&self) {
        self.redis_available
            .store(false, std::sync::atomic::Ordering::Relaxed);
    }

    /// Persist the last turns for `session_id`. Tries remote first; on
    /// failure, flips to local-only for the rest of the process.
    pub async fn save_session(&self, snapshot: &SessionSnapshot) {
        let key = session_key(&snapshot.user_id, &snapshot.session_id);
        let payload = match serde_json::to_string(snapshot) {
            Ok(p) => p,
            Err(_) => return,
        };

        if self.remote_is_usable() {
            let remote = self.remote.as_ref().expect("checked by remote_is_usable");
            if remote.set(&key, &payload, Some(SESSION_TTL)).await.is_ok() {
                return;
            }
            self.mark_remote_unavailable();
        }

        self.local.lock().set(&key, &payload, SESSION_TTL, Utc::now());
    }

    pub async fn load_session(&self, user_id: &str, session_id: &str) -> Option<SessionSnapshot> {
        let key = session_key(user_id, session_id);

        if self.remote_is_usable() {
            let remote = self.remote.as_ref().expect("checked by remote_is_usable");
            match remote.get(&key).await {
                Ok(Some(raw)) => return serde_json::from_str(&raw).ok(),
                Ok(None) => return None,
                Err(_) => self.mark_remote_unavailable(),
            }
        }

        let raw = self.local.lock().get(&key, Utc::now())?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn forget_session(&self, user_id: &str, session_id: &str) {
        let key = session_key(user_id, session_id);
        if self.remote_is_usable() {
            let remote = self.remote.as_ref().expect("checked by remote_is_usable");
            if remote.del(&key).await.is_err() {
                self.mark_remote_unavailable();
            }
        }
        self.local.lock().del(&key);
    }

    /// Record that `topic` came up for `user_id`, capped per user.
    pub async fn record_topic(&self, user_id: &str, topic: &str) {
        let key = topic_key(user_id);

        if self.remote_is_usable() {
            let remote = self.remote.as_ref().expect("checked by remote_is_usable");
            if remote.set_add(&key, topic).await.is_ok()
                && remote.expire(&key, TOPIC_TTL).await.is_ok()
            {
                return;
            }
            self.mark_remote_unavailable();
        }

        self.local.lock().topic_add(&key, topic, Utc::now());
    }

    pub async fn recent_topics(&self, user_id: &str) -> Vec<String> {
        let key = topic_key(user_id);

        if self.remote_is_usable() {
            let remote = self.remote.as_ref().expect("checked by remote_is_usable");
            match remote.set_members(&key).await {
                Ok(members) => return members,
                Err(_) => self.mark_remote_unavailable(),
            }
        }

        self.local.lock().topic_members(&key, Utc::now())
    }

    pub fn is_remote_available(&self) -> bool {
        self.remote_is_usable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raconteur_traits::error::ToolError;

    struct FailingRemote;

    #[async_trait::async_trait]
    impl RemoteCachePort for FailingRemote {
        async fn get(&self, _key: &str) -> raconteur_traits::error::Result<Option<String>> {
            Err(ToolError::Tool("remote down".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> raconteur_traits::error::Result<()> {
            Err(ToolError::Tool("remote down".to_string()))
        }
        async fn del(&self, _key: &str) -> raconteur_traits::error::Result<()> {
            Err(ToolError::Tool("remote down".to_string()))
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> raconteur_traits::error::Result<()> {
            Err(ToolError::Tool("remote down".to_string()))
        }
        async fn set_add(&self, _key: &str, _member: &str) -> raconteur_traits::error::Result<()> {
            Err(ToolError::Tool("remote down".to_string()))
        }
        async fn set_members(&self, _key: &str) -> raconteur_traits::error::Result<Vec<String>> {
            Err(ToolError::Tool("remote down".to_string()))
        }
    }

    #[tokio::test]
    async fn falls_back_to_local_when_remote_fails() {
        let cache = SessionContinuityCache::new(Some(Arc::new(FailingRemote)));
        assert!(cache.is_remote_available());

        let snapshot = SessionSnapshot {
            session_id: "s1".to_string(),
            user_id: "u1".to_string(),
            last_turns: vec!["hello".to_string()],
            updated_at: Utc::now(),
        };
        cache.save_session(&snapshot).await;
        assert!(!cache.is_remote_available());

        let loaded = cache.load_session("u1", "s1").await.expect("local fallback should have it");
        assert_eq!(loaded.last_turns, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn local_only_round_trips_session() {
        let cache = SessionContinuityCache::local_only();
        let snapshot = SessionSnapshot {
            session_id: "s2".to_string(),
            user_id: "u2".to_string(),
            last_turns: vec!["hi".to_string(), "how are you".to_string()],
            updated_at: Utc::now(),
        };
        cache.save_session(&snapshot).await;
        let loaded = cache.load_session("u2", "s2").await.unwrap();
        assert_eq!(loaded.last_turns.len(), 2);
    }

    #[tokio::test]
    async fn topic_recording_caps_per_user() {
        let cache = SessionContinuityCache::local_only();
        for i in 0..(MAX_TOPICS_PER_USER + 10) {
            cache.record_topic("u3", &format!("topic-{i}")).await;
        }
        let topics = cache.recent_topics("u3").await;
        assert!(topics.len() <= MAX_TOPICS_PER_USER);
    }

    #[tokio::test]
    async fn topic_tracking_caps_distinct_users() {
        let cache = SessionContinuityCache::local_only();
        for i in 0..(MAX_TOPIC_USERS + 10) {
            cache.record_topic(&format!("user-{i}"), "intro").await;
        }
        assert!(cache.local.lock().topics.len() <= MAX_TOPIC_USERS);
    }

    #[tokio::test]
    async fn forgetting_a_session_removes_it() {
        let cache = SessionContinuityCache::local_only();
        let snapshot = SessionSnapshot {
            session_id: "s3".to_string(),
            user_id: "u4".to_string(),
            last_turns: vec!["x".to_string()],
            updated_at: Utc::now(),
        };
        cache.save_session(&snapshot).await;
        cache.forget_session("u4", "s3").await;
        assert!(cache.load_session("u4", "s3").await.is_none());
    }
}
