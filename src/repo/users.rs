/// User repository
///
/// Composes DocumentStore + GraphStore + CacheAside. Entity reads are cached
/// with the entity TTL, relationship and listing reads with the shorter
/// relation TTL. Credential fields never leave this layer: reads return the
/// `User` projection.
use crate::cache::{keys, CacheAside};
use crate::docstore::models::{NewUser, Role, User, UserUpdate};
use crate::docstore::DocumentStore;
use crate::error::{HiveError, HiveResult};
use crate::graph::{GraphStore, MessageEntry};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Composite of a user with both sides of the follow relation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRelationships {
    pub user: User,
    pub followers: Vec<User>,
    pub following: Vec<User>,
}

#[derive(Clone)]
pub struct UserRepository {
    docs: Arc<DocumentStore>,
    graph: Arc<GraphStore>,
    cache: CacheAside,
    entity_ttl: u64,
    relation_ttl: u64,
}

impl UserRepository {
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

    pub async fn get_by_id(&self, id: &str) -> HiveResult<Option<User>> {
        let key = keys::user(id);
        self.cache
            .cached_optional(&key, self.entity_ttl, || async {
                Ok(self.docs.get_user(id).await?.map(User::from))
            })
            .await
    }

    pub async fn get_by_email(&self, email: &str) -> HiveResult<Option<User>> {
        let email = email.to_lowercase();
        let key = keys::user_email(&email);
        self.cache
            .cached_optional(&key, self.entity_ttl, || async {
                Ok(self.docs.get_user_by_email(&email).await?.map(User::from))
            })
            .await
    }

    pub async fn get_by_username(&self, username: &str) -> HiveResult<Option<User>> {
        let key = keys::user_username(username);
        self.cache
            .cached_optional(&key, self.entity_ttl, || async {
                Ok(self
                    .docs
                    .get_user_by_username(username)
                    .await?
                    .map(User::from))
            })
            .await
    }

    /// Users following `id`, hydrated from the document store
    pub async fn get_followers(&self, id: &str) -> HiveResult<Vec<User>> {
        let key = keys::user_followers(id);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                let ids = self.graph.followers(id).await?;
                self.hydrate(ids).await
            })
            .await
    }

    /// Users that `id` follows, hydrated from the document store
    pub async fn get_following(&self, id: &str) -> HiveResult<Vec<User>> {
        let key = keys::user_following(id);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                let ids = self.graph.following(id).await?;
                self.hydrate(ids).await
            })
            .await
    }

    /// Self + followers + following, with the sub-reads fanned out in parallel
    pub async fn get_relationships(&self, id: &str) -> HiveResult<UserRelationships> {
        let key = keys::user_relationships(id);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                let (user, followers, following) = futures::try_join!(
                    self.get_by_id(id),
                    self.get_followers(id),
                    self.get_following(id),
                )?;

                let user =
                    user.ok_or_else(|| HiveError::NotFound(format!("User {} not found", id)))?;

                Ok(UserRelationships {
                    user,
                    followers,
                    following,
                })
            })
            .await
    }

    pub async fn is_following(&self, follower: &str, followee: &str) -> HiveResult<bool> {
        let key = keys::is_following(follower, followee);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                self.graph.is_following(follower, followee).await
            })
            .await
    }

    /// All users, optionally excluding one id (typically the caller)
    pub async fn get_all(&self, exclude: Option<&str>) -> HiveResult<Vec<User>> {
        let key = keys::users_all(exclude);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                let records = self.docs.list_users(exclude).await?;
                Ok(records.into_iter().map(User::from).collect())
            })
            .await
    }

    /// Case-insensitive substring search over username and full name
    pub async fn search(&self, query: &str) -> HiveResult<Vec<User>> {
        let key = keys::users_search(query);
        self.cache
            .cached(&key, self.relation_ttl, || async {
                let records = self.docs.search_users(query).await?;
                Ok(records.into_iter().map(User::from).collect())
            })
            .await
    }

    // ==================== Writes ====================

    /// Register a user. The document write is authoritative; the mirroring
    /// graph node is best-effort and healed lazily by later operations.
    pub async fn create(&self, new_user: &NewUser) -> HiveResult<User> {
        let record = self.docs.create_user(new_user).await?;

        if let Err(e) = self.graph.upsert_user_node(&record.id).await {
            warn!("Graph node creation failed for user {}: {}", record.id, e);
        }

        // A new user can appear in any listing or search result set
        self.cache.invalidate_pattern(&keys::user_pattern()).await;
        self.cache.invalidate_pattern(&keys::users_pattern()).await;

        Ok(User::from(record))
    }

    /// Profile update. Invalidates the user's own keys (old and new
    /// username/email slots), their relationship keys, and every isFollowing
    /// key naming them in either position.
    pub async fn update(&self, id: &str, update: &UserUpdate) -> HiveResult<User> {
        let previous = self
            .docs
            .get_user(id)
            .await?
            .ok_or_else(|| HiveError::NotFound(format!("User {} not found", id)))?;

        let record = self.docs.update_user(id, update).await?;

        self.cache.invalidate(&keys::user(id)).await;
        self.cache.invalidate(&keys::user_email(&previous.email)).await;
        self.cache.invalidate(&keys::user_email(&record.email)).await;
        self.cache
            .invalidate(&keys::user_username(&previous.username))
            .await;
        self.cache
            .invalidate(&keys::user_username(&record.username))
            .await;
        self.cache.invalidate(&keys::user_relationships(id)).await;
        self.cache.invalidate(&keys::user_followers(id)).await;
        self.cache.invalidate(&keys::user_following(id)).await;
        self.cache
            .invalidate_pattern(&keys::is_following_source_pattern(id))
            .await;
        self.cache
            .invalidate_pattern(&keys::is_following_target_pattern(id))
            .await;

        Ok(User::from(record))
    }

    /// Role change: narrower fan-out than a profile update
    pub async fn update_role(&self, id: &str, role: Role) -> HiveResult<()> {
        self.docs.update_user_role(id, role).await?;

        if let Some(record) = self.docs.get_user(id).await? {
            self.cache.invalidate(&keys::user(id)).await;
            self.cache.invalidate(&keys::user_email(&record.email)).await;
            self.cache
                .invalidate(&keys::user_username(&record.username))
                .await;
        }
        self.cache
            .invalidate_pattern(&keys::users_all_pattern())
            .await;

        Ok(())
    }

    /// Follow another user. The graph write is the sole effect, so a graph
    /// failure is fatal here.
    pub async fn follow(&self, follower: &str, followee: &str) -> HiveResult<()> {
        self.graph.follow(follower, followee).await?;
        self.invalidate_follow_keys(follower, followee).await;
        Ok(())
    }

    pub async fn unfollow(&self, follower: &str, followee: &str) -> HiveResult<()> {
        self.graph.unfollow(follower, followee).await?;
        self.invalidate_follow_keys(follower, followee).await;
        Ok(())
    }

    /// Credential check against the document store, never the cache, so a
    /// just-rotated password can't authenticate stale. Returns the user on
    /// success, `None` on unknown email or digest mismatch.
    pub async fn verify_password(&self, email: &str, password: &str) -> HiveResult<Option<User>> {
        let record = match self.docs.get_user_by_email(email).await? {
            Some(record) => record,
            None => return Ok(None),
        };

        if credential_digest(&record.password_salt, password) != record.password_hash {
            return Ok(None);
        }

        // Whatever the cache held for this user predates this login
        self.cache.invalidate(&keys::user(&record.id)).await;

        Ok(Some(User::from(record)))
    }

    // ==================== Messaging ====================

    /// Append a MESSAGE edge with a generated id. Sole-effect graph write:
    /// failures propagate.
    pub async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        content: &str,
    ) -> HiveResult<MessageEntry> {
        let message_id = Uuid::new_v4().to_string();
        self.graph
            .send_message(sender, receiver, content, &message_id)
            .await
    }

    /// Full conversation between two users, oldest first. Short-circuits
    /// through the existence check before loading edges.
    pub async fn get_conversation(&self, a: &str, b: &str) -> HiveResult<Vec<MessageEntry>> {
        if !self.graph.has_messages(a, b).await? {
            return Ok(Vec::new());
        }

        self.graph.conversation(a, b).await
    }

    pub async fn has_messages(&self, a: &str, b: &str) -> HiveResult<bool> {
        self.graph.has_messages(a, b).await
    }

    // ==================== Internals ====================

    /// Resolve graph ids to full user records; an empty id set never touches
    /// the document store.
    async fn hydrate(&self, ids: Vec<String>) -> HiveResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.docs.get_users_by_ids(&ids).await?;
        Ok(records.into_iter().map(User::from).collect())
    }

    async fn invalidate_follow_keys(&self, follower: &str, followee: &str) {
        self.cache
            .invalidate(&keys::user_relationships(follower))
            .await;
        self.cache
            .invalidate(&keys::user_relationships(followee))
            .await;
        self.cache.invalidate(&keys::user_followers(followee)).await;
        self.cache.invalidate(&keys::user_following(follower)).await;
        self.cache
            .invalidate(&keys::is_following(follower, followee))
            .await;
    }
}

/// Hex digest of salt + password, matching the stored credential format
fn credential_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_digest_is_stable() {
        let first = credential_digest("salt", "hunter2");
        let second = credential_digest("salt", "hunter2");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_credential_digest_varies_by_salt() {
        assert_ne!(
            credential_digest("salt-a", "hunter2"),
            credential_digest("salt-b", "hunter2")
        );
    }
}
