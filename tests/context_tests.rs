/// Context wiring tests: on-disk databases, embedded migrations, the
/// cache-disabled degradation path.
mod common;

use common::{new_dataset, new_user};
use datahive::config::{CacheConfig, CoreConfig, DocumentStoreConfig, GraphStoreConfig};
use datahive::context::AppContext;

fn disk_config(dir: &std::path::Path) -> CoreConfig {
    CoreConfig {
        documents: DocumentStoreConfig {
            db_path: dir.join("documents.sqlite"),
            max_connections: 2,
        },
        graph: GraphStoreConfig {
            db_path: dir.join("graph.sqlite"),
            max_connections: 2,
        },
        cache: CacheConfig::default(),
    }
}

#[tokio::test]
async fn test_context_opens_stores_and_runs_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::new(disk_config(dir.path())).await.unwrap();

    // Caching disabled by default: repositories still work end to end
    assert!(ctx.cache.is_none());
    ctx.ping_cache().await.unwrap();

    let owner = ctx.users.create(&new_user("owner")).await.unwrap();
    let dataset = ctx
        .datasets
        .create(&new_dataset("climate", &owner.id))
        .await
        .unwrap();

    assert!(ctx.users.get_by_id(&owner.id).await.unwrap().is_some());
    assert!(ctx.datasets.get_by_id(&dataset.id).await.unwrap().is_some());

    // The CREATED edge was mirrored into the graph database
    assert_eq!(
        ctx.graph.created_by(&dataset.id).await.unwrap().as_deref(),
        Some(owner.id.as_str())
    );
}

#[tokio::test]
async fn test_context_rejects_shared_database_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = disk_config(dir.path());
    config.graph.db_path = config.documents.db_path.clone();

    assert!(AppContext::new(config).await.is_err());
}
