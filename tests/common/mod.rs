//! Shared test harness: in-memory SQLite for both stores, `MemoryCache`
//! standing in for the Redis primary/replica pair.
#![allow(dead_code)]

use chrono::NaiveDate;
use datahive::cache::{CacheStore, MemoryCache};
use datahive::config::{CacheConfig, CoreConfig, DocumentStoreConfig, GraphStoreConfig};
use datahive::context::AppContext;
use datahive::docstore::models::{NewDataset, NewUser};
use datahive::docstore::DocumentStore;
use datahive::graph::GraphStore;
use datahive::{docstore, graph};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

pub struct TestHarness {
    pub ctx: AppContext,
    /// Direct handle on the cache backend for inspecting keys
    pub cache: Arc<MemoryCache>,
}

pub async fn harness() -> TestHarness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .try_init();

    let documents_pool = memory_pool().await;
    docstore::run_migrations(&documents_pool).await.unwrap();

    let graph_pool = memory_pool().await;
    graph::run_migrations(&graph_pool).await.unwrap();

    let cache = Arc::new(MemoryCache::new());
    let cache_store: Arc<dyn CacheStore> = cache.clone();

    let ctx = AppContext::assemble(
        test_config(),
        Arc::new(DocumentStore::new(documents_pool)),
        Arc::new(GraphStore::new(graph_pool)),
        Some(cache_store),
    );

    TestHarness { ctx, cache }
}

pub async fn memory_pool() -> SqlitePool {
    sqlx::pool::PoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub fn test_config() -> CoreConfig {
    CoreConfig {
        documents: DocumentStoreConfig {
            db_path: "./test-data/documents.sqlite".into(),
            max_connections: 1,
        },
        graph: GraphStoreConfig {
            db_path: "./test-data/graph.sqlite".into(),
            max_connections: 1,
        },
        cache: CacheConfig::default(),
    }
}

/// Matches the repository's stored credential format
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn new_user(username: &str) -> NewUser {
    let salt = format!("salt-{}", username);
    NewUser {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        full_name: format!("{} Example", username),
        password_hash: hash_password(&salt, "hunter2"),
        password_salt: salt,
        birth_date: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
        avatar_ref: None,
    }
}

pub fn new_dataset(name: &str, owner_id: &str) -> NewDataset {
    NewDataset {
        name: name.to_string(),
        description: format!("{} description", name),
        size_mb: 12.5,
        owner_id: owner_id.to_string(),
        image_ref: None,
        video_ref: None,
        file_refs: vec![format!("{}.csv", name)],
    }
}
