/// Dataset repository
///
/// Symmetric to the user repository: cached document reads, cached graph
/// composites, write-then-invalidate mutations. The broad `datasets:*`
/// fan-out is reserved for changes that affect list membership or filtering
/// (creation, state changes) - content edits and download increments stay
/// key-scoped.
use crate::cache::{keys, CacheAside};
use crate::docstore::models::{Dataset, DatasetState, DatasetUpdate, NewDataset, User};
use crate::docstore::DocumentStore;
use crate::error::HiveResult;
use crate::graph::{CommentEntry, GraphStore, VoteEntry, VoteType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Dataset body joined with its social aggregates. `is_following` is only
/// present for personalized reads (a viewer id was supplied).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSocialInfo {
    pub dataset: Dataset,
    pub follower_count: i64,
    pub vote_count: i64,
    pub is_following: Option<bool>,
}

#[derive(Clone)]
pub struct DatasetRepository {
    docs: Arc<DocumentStore>,
    graph: Arc<GraphStore>,
    cache: CacheAside,
    entity_ttl: u64,
    relation_ttl: u64,
}

impl DatasetRepository {
    pub fn new(
        docs: Arc<DocumentStore>,
        graph: Arc<GraphStore>,
        cache: CacheAside,
        entity_ttl: u64,
        relation_ttl: u64,
    ) -> Self {
        Self {
            docs,
            graph,
            cache,
            entity_ttl,
            relation_ttl,
        }
    }

    // ==================== Reads ====================

    pub async fn get_by_id(&self, id: &str) -> HiveResult<Option<Dataset>> {
        let key = keys::dataset(id);
        self.cache
            .cached_optional(&key, self.entity_ttl, || async {
                self.docs.get_dataset(id).await
            })
            .await
    }

    pub async fn get_all(&self) -> HiveResult<Vec<Dataset>> {
        let key = keys::datasets_all();
        self.cache
            .cached(&key, self.relation_ttl, || async {
                self.docs.list_datasets().await
            })
            .await
    }

    pub async fn get_approved(&self) -> HiveResult<Vec<Dataset>> {
        let key = keys::datasets_approved();
        self.cache
            .cached(&key, self.relation_ttl, || async {
                self.docs.list_approved_datasets().await
            })
            .await
    }

    pub async fn get_by_owner(&self, owner_id: &str) -> HiveResult<Vec<Dataset>> {
        let key = keys::user_datasets(owner_id);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                self.docs.list_datasets_by_owner(owner_id).await
            })
            .await
    }

    /// Dataset body + social aggregates, sub-reads fanned out in parallel.
    /// The personalized `is_following` fetch is skipped for anonymous
    /// viewers.
    pub async fn get_with_social_info(
        &self,
        id: &str,
        viewer: Option<&str>,
    ) -> HiveResult<Option<DatasetSocialInfo>> {
        let key = keys::dataset_social(id, viewer);
        self.cache
            .cached_optional(&key, self.relation_ttl, || async {
                let dataset = match self.docs.get_dataset(id).await? {
                    Some(dataset) => dataset,
                    None => return Ok(None),
                };

                let (follower_count, vote_count, is_following) = match viewer {
                    Some(viewer) => {
                        let (followers, votes, following) = futures::try_join!(
                            self.graph.count_followers(id),
                            self.graph.count_votes(id),
                            self.graph.is_following(viewer, id),
                        )?;
                        (followers, votes, Some(following))
                    }
                    None => {
                        let (followers, votes) = futures::try_join!(
                            self.graph.count_followers(id),
                            self.graph.count_votes(id),
                        )?;
                        (followers, votes, None)
                    }
                };

                Ok(Some(DatasetSocialInfo {
                    dataset,
                    follower_count,
                    vote_count,
                    is_following,
                }))
            })
            .await
    }

    /// All votes on a dataset, most recent first
    pub async fn get_votes(&self, id: &str) -> HiveResult<Vec<VoteEntry>> {
        let key = keys::dataset_votes(id);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                self.graph.votes_for(id).await
            })
            .await
    }

    /// Users following a dataset, hydrated from the document store
    pub async fn get_followers(&self, id: &str) -> HiveResult<Vec<User>> {
        let key = keys::dataset_followers(id);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                let ids = self.graph.followers(id).await?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let records = self.docs.get_users_by_ids(&ids).await?;
                Ok(records.into_iter().map(User::from).collect())
            })
            .await
    }

    // ==================== Writes ====================

    /// Create a dataset. The document write is authoritative; the graph node
    /// and CREATED edge are best-effort mirrors.
    pub async fn create(&self, new_dataset: &NewDataset) -> HiveResult<Dataset> {
        let dataset = self.docs.create_dataset(new_dataset).await?;

        if let Err(e) = self.mirror_creation(&dataset).await {
            warn!("Graph mirror failed for dataset {}: {}", dataset.id, e);
        }

        self.cache.invalidate_pattern(&keys::dataset_pattern()).await;
        self.cache
            .invalidate_pattern(&keys::datasets_pattern())
            .await;
        self.cache
            .invalidate(&keys::user_datasets(&dataset.owner_id))
            .await;

        Ok(dataset)
    }

    /// Owner content edit; list membership is unchanged so the broad
    /// listing keys are left to expire
    pub async fn update(&self, id: &str, update: &DatasetUpdate) -> HiveResult<Dataset> {
        let dataset = self.docs.update_dataset(id, update).await?;

        self.cache.invalidate(&keys::dataset(id)).await;
        self.cache
            .invalidate_pattern(&keys::dataset_social_pattern(id))
            .await;
        self.cache
            .invalidate(&keys::user_datasets(&dataset.owner_id))
            .await;

        Ok(dataset)
    }

    /// Admin/owner state transition; changes list filtering, so the listing
    /// family is invalidated too
    pub async fn update_state(&self, id: &str, state: DatasetState) -> HiveResult<()> {
        self.docs.update_dataset_state(id, state).await?;

        self.cache.invalidate(&keys::dataset(id)).await;
        self.cache
            .invalidate_pattern(&keys::dataset_social_pattern(id))
            .await;
        self.cache
            .invalidate_pattern(&keys::datasets_pattern())
            .await;
        if let Some(dataset) = self.docs.get_dataset(id).await? {
            self.cache
                .invalidate(&keys::user_datasets(&dataset.owner_id))
                .await;
        }

        Ok(())
    }

    /// Bump the download counter; no list ordering or filtering depends on
    /// it, so only the dataset's own keys are touched
    pub async fn increment_downloads(&self, id: &str) -> HiveResult<i64> {
        let count = self.docs.increment_downloads(id).await?;

        self.cache.invalidate(&keys::dataset(id)).await;
        self.cache
            .invalidate_pattern(&keys::dataset_social_pattern(id))
            .await;

        Ok(count)
    }

    /// Follow a dataset. Sole-effect graph write: failures propagate.
    pub async fn follow(&self, user_id: &str, dataset_id: &str) -> HiveResult<()> {
        self.graph.follow(user_id, dataset_id).await?;
        self.invalidate_follow_keys(user_id, dataset_id).await;
        Ok(())
    }

    pub async fn unfollow(&self, user_id: &str, dataset_id: &str) -> HiveResult<()> {
        self.graph.unfollow(user_id, dataset_id).await?;
        self.invalidate_follow_keys(user_id, dataset_id).await;
        Ok(())
    }

    /// Cast or change a vote. Sole-effect graph write: failures propagate.
    pub async fn vote(
        &self,
        user_id: &str,
        dataset_id: &str,
        vote_type: VoteType,
    ) -> HiveResult<()> {
        self.graph.vote(user_id, dataset_id, vote_type).await?;

        self.cache
            .invalidate_pattern(&keys::dataset_social_pattern(dataset_id))
            .await;
        self.cache.invalidate(&keys::dataset_votes(dataset_id)).await;

        Ok(())
    }

    // ==================== Comments ====================

    /// Append a comment; returns the generated id and timestamp for display
    /// without a re-read. Uncached by design - no comment keys exist in the
    /// cache grammar.
    pub async fn add_comment(
        &self,
        user_id: &str,
        dataset_id: &str,
        content: &str,
    ) -> HiveResult<CommentEntry> {
        self.graph.comment(user_id, dataset_id, content).await
    }

    pub async fn get_comments(&self, dataset_id: &str) -> HiveResult<Vec<CommentEntry>> {
        self.graph.comments_for(dataset_id).await
    }

    /// Moderation soft-delete; no-op when the comment does not exist
    pub async fn hide_comment(&self, comment_id: &str) -> HiveResult<()> {
        self.graph.hide_comment(comment_id).await
    }

    // ==================== Internals ====================

    async fn mirror_creation(&self, dataset: &Dataset) -> HiveResult<()> {
        // Heal a possibly-missing owner node before hanging edges off it
        self.graph.upsert_user_node(&dataset.owner_id).await?;
        self.graph
            .upsert_dataset_node(&dataset.id, &dataset.owner_id)
            .await?;
        self.graph
            .mark_created(&dataset.owner_id, &dataset.id)
            .await?;
        Ok(())
    }

    async fn invalidate_follow_keys(&self, user_id: &str, dataset_id: &str) {
        self.cache
            .invalidate_pattern(&keys::dataset_social_pattern(dataset_id))
            .await;
        self.cache
            .invalidate(&keys::is_following(user_id, dataset_id))
            .await;
        self.cache
            .invalidate(&keys::dataset_followers(dataset_id))
            .await;
    }
}
