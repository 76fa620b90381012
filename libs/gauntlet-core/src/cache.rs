//! Cache-aside layer fronting the document store for hot entities.
//!
//! Key shapes and TTLs are defined here only, so the repository and the
//! cache backend can never drift. Cache failures degrade to a miss;
//! the source of truth is always the store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

pub const TEAM_PREFIX: &str = "team";
pub const LEVEL_PREFIX: &str = "level";
pub const TESTCASES_PREFIX: &str = "testcases";
pub const LEADERBOARD_PREFIX: &str = "leaderboard";

/// Per-entity TTLs in seconds. Leaderboard pages are the only
/// aggressively short-lived entry: rank depends on every team's score.
pub const TTL_TEAM: u64 = 7200;
pub const TTL_LEVEL: u64 = 7200;
pub const TTL_TESTCASES: u64 = 86400;
pub const TTL_LEADERBOARD: u64 = 60;
pub const TTL_LEVEL_COUNT: u64 = 7200;

pub fn team_key(team_id: Uuid) -> String {
    format!("{}:{}", TEAM_PREFIX, team_id)
}

pub fn level_number_key(level_number: u32) -> String {
    format!("{}:number:{}", LEVEL_PREFIX, level_number)
}

pub fn level_count_key() -> String {
    format!("{}:count", LEVEL_PREFIX)
}

pub fn test_cases_key(level_id: Uuid) -> String {
    format!("{}:{}", TESTCASES_PREFIX, level_id)
}

pub fn leaderboard_key(page: u32, limit: u32) -> String {
    format!("{}:page:{}:limit:{}", LEADERBOARD_PREFIX, page, limit)
}

/// Flat string-keyed cache over opaque serialized documents.
///
/// All operations are infallible from the caller's point of view: a
/// backend error is logged and reported as a miss (`get`) or a no-op
/// (writes), never propagated.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64);
    async fn del(&self, key: &str);
    /// Delete every key starting with `prefix`.
    async fn del_prefix(&self, prefix: &str);
}

pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding undecodable cache entry");
            cache.del(key).await;
            None
        }
    }
}

pub async fn set_json<T: Serialize>(cache: &dyn Cache, key: &str, value: &T, ttl_secs: u64) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.set_ex(key, &raw, ttl_secs).await,
        Err(e) => warn!(key, error = %e, "Failed to serialize cache value"),
    }
}

/// Redis-backed cache. `ConnectionManager` reconnects internally, so a
/// clone per operation is cheap and the handle stays shareable.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache GET failed, treating as miss");
                None
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<()> = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!(key, error = %e, "Cache SET failed");
        }
    }

    async fn del(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(key, error = %e, "Cache DEL failed");
        }
    }

    async fn del_prefix(&self, prefix: &str) {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);
        let keys: Vec<String> = match conn.keys(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern, error = %e, "Cache KEYS failed");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        if let Err(e) = conn.del::<_, ()>(keys).await {
            warn!(pattern, error = %e, "Cache DEL pattern failed");
        }
    }
}

/// In-process cache honoring TTLs. Backs tests and single-node runs
/// where Redis is not available.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, deadline)) if Instant::now() < *deadline => Some(value.clone()),
            _ => None,
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value.to_string(), deadline));
    }

    async fn del(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn del_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let id = Uuid::new_v4();
        assert_eq!(team_key(id), format!("team:{}", id));
        assert_eq!(level_number_key(4), "level:number:4");
        assert_eq!(level_count_key(), "level:count");
        assert_eq!(leaderboard_key(2, 10), "leaderboard:page:2:limit:10");
        assert!(test_cases_key(id).starts_with("testcases:"));
    }

    #[test]
    fn test_key_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(test_cases_key(id), test_cases_key(id));
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        cache.set_ex("team:1", "{\"score\":10}", 60).await;
        assert_eq!(cache.get("team:1").await.as_deref(), Some("{\"score\":10}"));

        cache.del("team:1").await;
        assert_eq!(cache.get("team:1").await, None);
    }

    #[tokio::test]
    async fn test_memory_cache_expiry() {
        let cache = MemoryCache::new();
        cache.set_ex("level:count", "5", 0).await;
        assert_eq!(cache.get("level:count").await, None);
    }

    #[tokio::test]
    async fn test_del_prefix() {
        let cache = MemoryCache::new();
        cache.set_ex("leaderboard:page:1:limit:10", "[]", 60).await;
        cache.set_ex("leaderboard:page:2:limit:10", "[]", 60).await;
        cache.set_ex("level:count", "5", 60).await;

        cache.del_prefix("leaderboard:").await;

        assert_eq!(cache.get("leaderboard:page:1:limit:10").await, None);
        assert_eq!(cache.get("leaderboard:page:2:limit:10").await, None);
        assert_eq!(cache.get("level:count").await.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_get_json_discards_garbage() {
        let cache = MemoryCache::new();
        cache.set_ex("team:x", "not json", 60).await;

        let decoded: Option<u32> = get_json(&cache, "team:x").await;
        assert_eq!(decoded, None);
        // The poisoned entry must be gone so the next read repopulates.
        assert_eq!(cache.get("team:x").await, None);
    }
}
