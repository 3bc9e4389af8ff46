/// Cache-aside executor
///
/// Wraps an arbitrary read with lookup -> miss -> compute -> populate, and
/// exposes the invalidation primitives repositories fan out through. One
/// executor is shared per repository, all backed by the same store handle.
///
/// Failure discipline: a broken cache never breaks a read. Lookup and
/// populate errors degrade to the computed value with a warning; invalidation
/// errors are logged and dropped, since TTL expiry recovers stale entries.
/// Compute errors always propagate uncached.
use crate::cache::CacheStore;
use crate::error::HiveResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct CacheAside {
    store: Option<Arc<dyn CacheStore>>,
}

impl CacheAside {
    /// Executor backed by a shared cache store
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Executor that routes every call straight to compute.
    ///
    /// Used for cache-outage degradation and cache-disabled deployments;
    /// invalidation becomes a no-op.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Cache-aside read: on hit return the cached value without invoking
    /// `compute`; on miss invoke it and populate the key with `ttl_secs`.
    pub async fn cached<T, F, Fut>(&self, key: &str, ttl_secs: u64, compute: F) -> HiveResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HiveResult<T>>,
    {
        let store = match &self.store {
            Some(store) => store,
            None => return compute().await,
        };

        if let Some(value) = self.lookup::<T>(store, key).await {
            return Ok(value);
        }

        let value = compute().await?;
        self.populate(store, key, &value, ttl_secs).await;
        Ok(value)
    }

    /// Variant for optional reads: `None` results are returned but never
    /// stored, so entity absence is not negatively cached.
    pub async fn cached_optional<T, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        compute: F,
    ) -> HiveResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HiveResult<Option<T>>>,
    {
        let store = match &self.store {
            Some(store) => store,
            None => return compute().await,
        };

        if let Some(value) = self.lookup::<T>(store, key).await {
            return Ok(Some(value));
        }

        let value = compute().await?;
        if let Some(ref present) = value {
            self.populate(store, key, present, ttl_secs).await;
        }
        Ok(value)
    }

    /// Delete a single key; a missing key counts as success
    pub async fn invalidate(&self, key: &str) {
        let Some(store) = &self.store else { return };

        if let Err(e) = store.delete(key).await {
            warn!("Cache invalidation failed for {}: {}", key, e);
        }
    }

    /// Enumerate keys matching `pattern` and bulk-delete them; zero matches
    /// is a no-op
    pub async fn invalidate_pattern(&self, pattern: &str) {
        let Some(store) = &self.store else { return };

        let keys = match store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cache key enumeration failed for {}: {}", pattern, e);
                return;
            }
        };

        if keys.is_empty() {
            return;
        }

        match store.delete_many(&keys).await {
            Ok(deleted) => debug!("Invalidated {} keys matching {}", deleted, pattern),
            Err(e) => warn!("Cache pattern invalidation failed for {}: {}", pattern, e),
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, store: &Arc<dyn CacheStore>, key: &str) -> Option<T> {
        match store.get(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Failed to deserialize cached value for {}: {}", key, e);
                    // Drop the corrupted entry and treat as a miss
                    if let Err(e) = store.delete(key).await {
                        warn!("Failed to drop corrupted cache entry {}: {}", key, e);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Cache lookup failed for {}, computing directly: {}", key, e);
                None
            }
        }
    }

    async fn populate<T: Serialize>(
        &self,
        store: &Arc<dyn CacheStore>,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize value for cache key {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = store.set(key, &json, ttl_secs).await {
            warn!("Cache populate failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::HiveError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor() -> CacheAside {
        CacheAside::new(Arc::new(MemoryCache::new()))
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_skips_compute() {
        let cache = executor();
        let calls = AtomicUsize::new(0);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, HiveError>(41 + 1)
        };

        let first: i64 = cache.cached("counter", 60, compute).await.unwrap();
        let second: i64 = cache
            .cached("counter", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compute_errors_propagate_uncached() {
        let cache = executor();

        let result: HiveResult<i64> = cache
            .cached("broken", 60, || async {
                Err(HiveError::Internal("boom".to_string()))
            })
            .await;
        assert!(result.is_err());

        // The failure was not cached: the next call computes again.
        let value: i64 = cache.cached("broken", 60, || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_none_is_not_negatively_cached() {
        let cache = executor();
        let calls = AtomicUsize::new(0);

        let miss: Option<String> = cache
            .cached_optional("absent", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(miss, None);

        let hit: Option<String> = cache
            .cached_optional("absent", 60, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some("found".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(hit.as_deref(), Some("found"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_missing_key_succeeds() {
        let cache = executor();
        cache.invalidate("never:stored").await;
    }

    #[tokio::test]
    async fn test_pattern_invalidation_forces_recompute() {
        let cache = executor();

        let _: i64 = cache.cached("dataset:1", 60, || async { Ok(1) }).await.unwrap();
        let _: i64 = cache.cached("datasets:all", 60, || async { Ok(2) }).await.unwrap();

        cache.invalidate_pattern("dataset*").await;

        let recomputed: i64 = cache.cached("datasets:all", 60, || async { Ok(3) }).await.unwrap();
        assert_eq!(recomputed, 3);
    }

    #[tokio::test]
    async fn test_zero_matches_is_a_noop() {
        let cache = executor();
        cache.invalidate_pattern("nothing:*").await;
    }

    #[tokio::test]
    async fn test_disabled_executor_always_computes() {
        let cache = CacheAside::disabled();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let _: i64 = cache
                .cached("counter", 60, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!cache.is_enabled());
    }
}
