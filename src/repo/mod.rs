/// Domain repositories
///
/// Facades composing the document store, the graph store, and the
/// cache-aside executor. Every read path is cached; every write path mutates
/// the authoritative store(s) first and then invalidates the affected cache
/// keys, never the other way around.

pub mod datasets;
pub mod users;

pub use datasets::{DatasetRepository, DatasetSocialInfo};
pub use users::{UserRelationships, UserRepository};
