/// Application context and dependency injection
///
/// Wires configuration to stores, the shared cache client, and the
/// repositories. The cache client is constructed exactly once here and
/// handed to both repositories, so every call site shares one connection
/// pool and one keyspace.
use crate::{
    cache::{CacheAside, CacheStore, RedisCache},
    config::CoreConfig,
    docstore::DocumentStore,
    error::HiveResult,
    graph::GraphStore,
    repo::{DatasetRepository, UserRepository},
};
use std::sync::Arc;
use tracing::info;

/// Shared services for the persistence core
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<CoreConfig>,
    pub documents: Arc<DocumentStore>,
    pub graph: Arc<GraphStore>,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub users: UserRepository,
    pub datasets: DatasetRepository,
}

impl AppContext {
    /// Build the full context from configuration: open both stores, run
    /// their migrations, connect the cache when enabled, construct the
    /// repositories.
    pub async fn new(config: CoreConfig) -> HiveResult<Self> {
        config.validate()?;

        let documents = Arc::new(DocumentStore::open(&config.documents).await?);
        let graph = Arc::new(GraphStore::open(&config.graph).await?);

        let cache: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            let client = RedisCache::connect(&config.cache).await?;
            Some(Arc::new(client))
        } else {
            info!("Caching disabled - repositories read the stores directly");
            None
        };

        Ok(Self::assemble(config, documents, graph, cache))
    }

    /// Assemble a context from already-constructed parts. Tests use this to
    /// inject in-memory stores and a `MemoryCache`.
    pub fn assemble(
        config: CoreConfig,
        documents: Arc<DocumentStore>,
        graph: Arc<GraphStore>,
        cache: Option<Arc<dyn CacheStore>>,
    ) -> Self {
        let executor = match &cache {
            Some(store) => CacheAside::new(Arc::clone(store)),
            None => CacheAside::disabled(),
        };

        let users = UserRepository::new(
            Arc::clone(&documents),
            Arc::clone(&graph),
            executor.clone(),
            config.cache.entity_ttl,
            config.cache.relation_ttl,
        );
        let datasets = DatasetRepository::new(
            Arc::clone(&documents),
            Arc::clone(&graph),
            executor,
            config.cache.entity_ttl,
            config.cache.relation_ttl,
        );

        Self {
            config: Arc::new(config),
            documents,
            graph,
            cache,
            users,
            datasets,
        }
    }

    /// Health check for the cache layer; `Ok` when caching is disabled
    pub async fn ping_cache(&self) -> HiveResult<()> {
        match &self.cache {
            Some(cache) => cache.ping().await,
            None => Ok(()),
        }
    }
}
