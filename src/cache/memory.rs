/// In-process cache backend
///
/// Implements `CacheStore` over a mutex-guarded map with per-entry expiry.
/// Used when a deployment runs without Redis and throughout the test suite,
/// where it stands in for the primary/replica pair.
use crate::cache::CacheStore;
use crate::error::HiveResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Map-backed cache with TTL expiry and glob-style key enumeration
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> HiveResult<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> HiveResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> HiveResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> HiveResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|(key, entry)| entry.expires_at > now && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_many(&self, keys: &[String]) -> HiveResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let mut deleted = 0;
        for key in keys {
            if entries.remove(key).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn ping(&self) -> HiveResult<()> {
        Ok(())
    }
}

/// Redis KEYS-style glob matching: `*` matches any run, `?` a single character
fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();

    let mut p = 0;
    let mut i = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while i < input.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == input[i]) {
            p += 1;
            i += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            mark = i;
            p += 1;
        } else if let Some(star_pos) = star {
            p = star_pos + 1;
            mark += 1;
            i = mark;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("user:*", "user:42"));
        assert!(glob_match("user:*", "user:relationships:42"));
        assert!(!glob_match("user:*", "users:all"));
        assert!(glob_match("isFollowing:*:u2", "isFollowing:u1:u2"));
        assert!(!glob_match("isFollowing:*:u2", "isFollowing:u1:u3"));
        assert!(glob_match("dataset:social:d1:*", "dataset:social:d1:anon"));
        assert!(glob_match("user:?", "user:a"));
        assert!(!glob_match("user:?", "user:ab"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("", "anything"));
        assert!(glob_match("", ""));
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("user:1", "{\"id\":\"1\"}", 60).await.unwrap();
        assert_eq!(cache.get("user:1").await.unwrap().as_deref(), Some("{\"id\":\"1\"}"));

        cache.delete("user:1").await.unwrap();
        assert_eq!(cache.get("user:1").await.unwrap(), None);

        // deleting a missing key succeeds
        cache.delete("user:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("user:1", "x", 0).await.unwrap();
        assert_eq!(cache.get("user:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_and_bulk_delete() {
        let cache = MemoryCache::new();
        cache.set("dataset:1", "a", 60).await.unwrap();
        cache.set("dataset:2", "b", 60).await.unwrap();
        cache.set("datasets:all", "c", 60).await.unwrap();

        let mut keys = cache.keys("dataset:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["dataset:1", "dataset:2"]);

        let deleted = cache.delete_many(&keys).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(cache.len(), 1);
    }
}
