/// Configuration management for the Datahive persistence core
///
/// The core never parses argv or config files itself; everything is injected
/// through environment variables by the surrounding service.
use crate::error::{HiveError, HiveResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Top-level core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub documents: DocumentStoreConfig,
    pub graph: GraphStoreConfig,
    pub cache: CacheConfig,
}

/// Document store (entity-of-record) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
}

/// Graph store (relationship-of-record) configuration
///
/// A separate database from the document store so the two systems of record
/// fail independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
}

/// Cache layer configuration
///
/// Primary takes writes and invalidation; the optional replica serves reads.
/// Replica lag is tolerated by design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching (default: false, repositories degrade to direct reads)
    pub enabled: bool,

    /// Primary Redis host:port (read/write)
    pub primary_host: String,
    pub primary_port: u16,

    /// Optional read-only replica host:port
    pub replica_host: Option<String>,
    pub replica_port: Option<u16>,

    /// Shared password for both nodes
    pub password: Option<String>,

    /// Key prefix for all cache entries (default: "hive:")
    pub key_prefix: String,

    /// TTL for single-entity reads in seconds (default: 600)
    pub entity_ttl: u64,

    /// TTL for relationship and listing reads in seconds (default: 300)
    pub relation_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            primary_host: "localhost".to_string(),
            primary_port: 6379,
            replica_host: None,
            replica_port: None,
            password: None,
            key_prefix: "hive:".to_string(),
            entity_ttl: 600,
            relation_ttl: 300,
        }
    }
}

impl CacheConfig {
    /// Connection URL for the primary node
    pub fn primary_url(&self) -> String {
        redis_url(&self.primary_host, self.primary_port, self.password.as_deref())
    }

    /// Connection URL for the replica, when one is configured
    pub fn replica_url(&self) -> Option<String> {
        let host = self.replica_host.as_deref()?;
        let port = self.replica_port.unwrap_or(self.primary_port);
        Some(redis_url(host, port, self.password.as_deref()))
    }
}

fn redis_url(host: &str, port: u16, password: Option<&str>) -> String {
    match password {
        Some(pass) => format!("redis://:{}@{}:{}", pass, host, port),
        None => format!("redis://{}:{}", host, port),
    }
}

impl CoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> HiveResult<Self> {
        dotenv::dotenv().ok();

        let data_directory: PathBuf = env::var("HIVE_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let documents_db = env::var("HIVE_DOCUMENTS_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("documents.sqlite"));
        let graph_db = env::var("HIVE_GRAPH_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("graph.sqlite"));

        let documents_max_connections = env::var("HIVE_DOCUMENTS_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let graph_max_connections = env::var("HIVE_GRAPH_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let cache_enabled = env::var("HIVE_CACHE_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let primary_host =
            env::var("HIVE_CACHE_PRIMARY_HOST").unwrap_or_else(|_| "localhost".to_string());
        let primary_port = env::var("HIVE_CACHE_PRIMARY_PORT")
            .unwrap_or_else(|_| "6379".to_string())
            .parse()
            .map_err(|_| HiveError::Validation("Invalid cache primary port".to_string()))?;
        let replica_host = env::var("HIVE_CACHE_REPLICA_HOST").ok();
        let replica_port = env::var("HIVE_CACHE_REPLICA_PORT")
            .ok()
            .and_then(|p| p.parse().ok());
        let password = env::var("HIVE_CACHE_PASSWORD").ok();
        let key_prefix =
            env::var("HIVE_CACHE_KEY_PREFIX").unwrap_or_else(|_| "hive:".to_string());
        let entity_ttl = env::var("HIVE_CACHE_ENTITY_TTL")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .unwrap_or(600);
        let relation_ttl = env::var("HIVE_CACHE_RELATION_TTL")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        Ok(CoreConfig {
            documents: DocumentStoreConfig {
                db_path: documents_db,
                max_connections: documents_max_connections,
            },
            graph: GraphStoreConfig {
                db_path: graph_db,
                max_connections: graph_max_connections,
            },
            cache: CacheConfig {
                enabled: cache_enabled,
                primary_host,
                primary_port,
                replica_host,
                replica_port,
                password,
                key_prefix,
                entity_ttl,
                relation_ttl,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> HiveResult<()> {
        if self.documents.db_path == self.graph.db_path {
            return Err(HiveError::Validation(
                "Document and graph stores must use separate databases".to_string(),
            ));
        }

        if self.cache.enabled && self.cache.primary_host.is_empty() {
            return Err(HiveError::Validation(
                "Cache primary host cannot be empty when caching is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.key_prefix, "hive:");
        assert_eq!(config.entity_ttl, 600);
        assert_eq!(config.relation_ttl, 300);
    }

    #[test]
    fn test_primary_url_with_password() {
        let config = CacheConfig {
            password: Some("sekrit".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(config.primary_url(), "redis://:sekrit@localhost:6379");
    }

    #[test]
    fn test_replica_url_falls_back_to_primary_port() {
        let config = CacheConfig {
            replica_host: Some("replica.internal".to_string()),
            ..CacheConfig::default()
        };
        assert_eq!(
            config.replica_url().as_deref(),
            Some("redis://replica.internal:6379")
        );
    }

    #[test]
    fn test_same_database_rejected() {
        let config = CoreConfig {
            documents: DocumentStoreConfig {
                db_path: "./data/store.sqlite".into(),
                max_connections: 10,
            },
            graph: GraphStoreConfig {
                db_path: "./data/store.sqlite".into(),
                max_connections: 10,
            },
            cache: CacheConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}
