/// Redis-based caching layer for the Datahive core
///
/// The cache is deployed as a primary (read/write) plus an optional read-only
/// replica. Writes, deletes, and key enumeration always target the primary;
/// reads prefer the replica when one is configured. Replica lag is tolerated -
/// a stale read is recovered by TTL expiry or the next invalidation.
///
/// Repositories never talk to Redis directly; they go through the
/// `CacheStore` trait so tests can substitute an in-process `MemoryCache`.

pub mod executor;
pub mod keys;
pub mod memory;

pub use executor::CacheAside;
pub use memory::MemoryCache;

use crate::config::CacheConfig;
use crate::error::{HiveError, HiveResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, info, warn};

/// Key/value store with per-key TTL and wildcard key enumeration.
///
/// Keys returned by `keys` are store-native (a Redis-backed store returns them
/// with its prefix applied) and must be passed back to `delete_many` verbatim.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> HiveResult<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> HiveResult<()>;
    async fn delete(&self, key: &str) -> HiveResult<()>;
    async fn keys(&self, pattern: &str) -> HiveResult<Vec<String>>;
    async fn delete_many(&self, keys: &[String]) -> HiveResult<u64>;
    async fn ping(&self) -> HiveResult<()>;
}

/// Redis cache client with a primary/replica connection split
#[derive(Clone)]
pub struct RedisCache {
    primary: ConnectionManager,
    replica: Option<ConnectionManager>,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to the configured primary (and replica, when present)
    pub async fn connect(config: &CacheConfig) -> HiveResult<Self> {
        if !config.enabled {
            return Err(HiveError::CacheUnavailable(
                "Cache is disabled, cannot create client".to_string(),
            ));
        }

        let primary_url = config.primary_url();
        info!("Connecting to Redis primary at {}:{}", config.primary_host, config.primary_port);

        let client = Client::open(primary_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            HiveError::CacheUnavailable(format!("Redis client creation failed: {}", e))
        })?;

        let primary = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis primary: {}", e);
            HiveError::CacheUnavailable(format!("Redis connection failed: {}", e))
        })?;

        let replica = match config.replica_url() {
            Some(url) => {
                info!("Connecting to Redis replica");
                let client = Client::open(url.as_str()).map_err(|e| {
                    HiveError::CacheUnavailable(format!("Redis replica client failed: {}", e))
                })?;
                Some(ConnectionManager::new(client).await.map_err(|e| {
                    error!("Failed to connect to Redis replica: {}", e);
                    HiveError::CacheUnavailable(format!("Redis replica connection failed: {}", e))
                })?)
            }
            None => None,
        };

        info!("Redis connection established");

        Ok(Self {
            primary,
            replica,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Connection used for reads: replica when configured, primary otherwise
    fn read_connection(&self) -> ConnectionManager {
        self.replica.clone().unwrap_or_else(|| self.primary.clone())
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> HiveResult<Option<String>> {
        let cache_key = self.build_key(key);

        let mut conn = self.read_connection();
        let result: Option<String> = conn.get(&cache_key).await.map_err(|e| {
            warn!("Redis GET failed for {}: {}", cache_key, e);
            HiveError::CacheUnavailable(format!("Cache get failed: {}", e))
        })?;

        match result {
            Some(value) => {
                debug!("Cache HIT: {}", cache_key);
                Ok(Some(value))
            }
            None => {
                debug!("Cache MISS: {}", cache_key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> HiveResult<()> {
        let cache_key = self.build_key(key);

        debug!("Cache SET: {} (TTL: {}s)", cache_key, ttl_secs);

        let mut conn = self.primary.clone();
        let _: () = conn.set_ex(&cache_key, value, ttl_secs).await.map_err(|e| {
            warn!("Redis SET failed for {}: {}", cache_key, e);
            HiveError::CacheUnavailable(format!("Cache set failed: {}", e))
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> HiveResult<()> {
        let cache_key = self.build_key(key);

        debug!("Cache DELETE: {}", cache_key);

        let mut conn = self.primary.clone();
        let _: () = conn.del(&cache_key).await.map_err(|e| {
            warn!("Redis DELETE failed for {}: {}", cache_key, e);
            HiveError::CacheUnavailable(format!("Cache delete failed: {}", e))
        })?;

        Ok(())
    }

    async fn keys(&self, pattern: &str) -> HiveResult<Vec<String>> {
        let cache_pattern = self.build_key(pattern);

        let mut conn = self.primary.clone();
        let keys: Vec<String> = conn.keys(&cache_pattern).await.map_err(|e| {
            warn!("Redis KEYS failed for {}: {}", cache_pattern, e);
            HiveError::CacheUnavailable(format!("Cache keys lookup failed: {}", e))
        })?;

        Ok(keys)
    }

    async fn delete_many(&self, keys: &[String]) -> HiveResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.primary.clone();
        let deleted: u64 = conn.del(keys).await.map_err(|e| {
            warn!("Redis DELETE multiple keys failed: {}", e);
            HiveError::CacheUnavailable(format!("Cache bulk delete failed: {}", e))
        })?;

        debug!("Cache flushed {} keys", deleted);
        Ok(deleted)
    }

    async fn ping(&self) -> HiveResult<()> {
        let mut conn = self.primary.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await.map_err(|e| {
            error!("Redis PING failed: {}", e);
            HiveError::CacheUnavailable(format!("Cache ping failed: {}", e))
        })?;

        if pong != "PONG" {
            return Err(HiveError::CacheUnavailable(
                "Unexpected Redis PING response".to_string(),
            ));
        }

        Ok(())
    }
}
