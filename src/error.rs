/// Unified error types for the Datahive persistence core
use thiserror::Error;

/// Main error type for the core
#[derive(Error, Debug)]
pub enum HiveError {
    /// Document store errors (connection, query, constraint)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity absent in the document store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique-constraint violation (username, email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Entity fields violate document-store constraints
    #[error("Validation error: {0}")]
    Validation(String),

    /// Graph store unreachable
    #[error("Graph store unavailable: {0}")]
    GraphUnavailable(String),

    /// Graph store reachable but the query failed
    #[error("Graph query failed: {0}")]
    GraphQueryFailed(String),

    /// Cache store unreachable or erroring
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core operations
pub type HiveResult<T> = Result<T, HiveError>;

impl HiveError {
    /// Classify a sqlx error coming from the graph database.
    ///
    /// Connectivity failures map to `GraphUnavailable`; anything the store
    /// itself rejected maps to `GraphQueryFailed`. The adapter never retries,
    /// so callers can tell the two apart when deciding whether to degrade.
    pub fn from_graph(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => HiveError::GraphUnavailable(e.to_string()),
            other => HiveError::GraphQueryFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_pool_errors_map_to_unavailable() {
        let err = HiveError::from_graph(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, HiveError::GraphUnavailable(_)));
    }

    #[test]
    fn graph_row_errors_map_to_query_failed() {
        let err = HiveError::from_graph(sqlx::Error::RowNotFound);
        assert!(matches!(err, HiveError::GraphQueryFailed(_)));
    }
}
