/// Datahive persistence core
///
/// Reconciles two systems of record - a document store holding entity bodies
/// (users, datasets) and a graph store holding relationships between them
/// (follows, authorship, votes, comments, direct messages) - behind a
/// read-through, pattern-invalidated Redis cache.
///
/// Route handlers consume this crate as a library boundary: they call
/// repository methods and never touch the stores or the cache directly.

pub mod cache;
pub mod config;
pub mod context;
pub mod docstore;
pub mod error;
pub mod graph;
pub mod repo;

pub use config::CoreConfig;
pub use context::AppContext;
pub use error::{HiveError, HiveResult};
