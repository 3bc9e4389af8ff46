/// Graph store - the relationship-of-record database
///
/// A property graph over its own SQLite database: `User{id}` and
/// `Dataset{id}` nodes, and directed typed edges FOLLOWS, CREATED, VOTED,
/// COMMENTED, MESSAGE. Edge creation is idempotent unless noted; votes
/// upsert-on-match; comments and messages are append-only.
///
/// The adapter performs no retries. Connectivity failures surface as
/// `GraphUnavailable`, rejected queries as `GraphQueryFailed`; repositories
/// decide per call site whether a failure is fatal or swallowed (secondary
/// writes mirroring an authoritative document write are swallowed and
/// logged).

pub mod models;

pub use models::{CommentEntry, MessageEntry, VoteEntry, VoteType};

use crate::config::GraphStoreConfig;
use crate::error::{HiveError, HiveResult};
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use std::path::Path;
use uuid::Uuid;

/// Typed access to nodes and edges
#[derive(Clone)]
pub struct GraphStore {
    pool: SqlitePool,
}

impl GraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database, creating it if missing
    pub async fn open(config: &GraphStoreConfig) -> HiveResult<Self> {
        let pool = create_pool(&config.db_path, config.max_connections).await?;
        run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== Nodes ====================

    /// Match-or-create a user node
    pub async fn upsert_user_node(&self, id: &str) -> HiveResult<()> {
        sqlx::query("INSERT OR IGNORE INTO user_nodes (id) VALUES (?1)")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(HiveError::from_graph)?;

        Ok(())
    }

    /// Match-or-create a dataset node. The owner recorded on first creation
    /// wins; a repeated upsert never duplicates or rewrites the node.
    pub async fn upsert_dataset_node(&self, id: &str, owner_id: &str) -> HiveResult<()> {
        sqlx::query("INSERT OR IGNORE INTO dataset_nodes (id, owner_id) VALUES (?1, ?2)")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(HiveError::from_graph)?;

        Ok(())
    }

    // ==================== FOLLOWS ====================

    /// Create the FOLLOWS edge; following twice is a no-op
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> HiveResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO follow_edges (follower_id, followee_id, created_at)
             VALUES (?1, ?2, ?3)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(())
    }

    /// Delete the FOLLOWS edge; succeeds silently when no edge exists
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> HiveResult<()> {
        sqlx::query("DELETE FROM follow_edges WHERE follower_id = ?1 AND followee_id = ?2")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&self.pool)
            .await
            .map_err(HiveError::from_graph)?;

        Ok(())
    }

    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> HiveResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follow_edges WHERE follower_id = ?1 AND followee_id = ?2",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(count > 0)
    }

    /// Ids following the given node. Order is unspecified; callers must not
    /// rely on it.
    pub async fn followers(&self, id: &str) -> HiveResult<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT follower_id FROM follow_edges WHERE followee_id = ?1")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(HiveError::from_graph)?;

        Ok(ids)
    }

    /// Ids the given node follows. Order is unspecified.
    pub async fn following(&self, id: &str) -> HiveResult<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT followee_id FROM follow_edges WHERE follower_id = ?1")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(HiveError::from_graph)?;

        Ok(ids)
    }

    pub async fn count_followers(&self, id: &str) -> HiveResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follow_edges WHERE followee_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(HiveError::from_graph)?;

        Ok(count)
    }

    // ==================== CREATED ====================

    /// Record authorship at dataset creation; never removed
    pub async fn mark_created(&self, user_id: &str, dataset_id: &str) -> HiveResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO created_edges (user_id, dataset_id, created_at)
             VALUES (?1, ?2, ?3)",
        )
        .bind(user_id)
        .bind(dataset_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(())
    }

    pub async fn created_by(&self, dataset_id: &str) -> HiveResult<Option<String>> {
        let user_id: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM created_edges WHERE dataset_id = ?1")
                .bind(dataset_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(HiveError::from_graph)?;

        Ok(user_id)
    }

    // ==================== VOTED ====================

    /// Match-or-create the VOTED edge, overwriting vote type and timestamp.
    /// At most one edge ever exists per (voter, dataset) pair.
    pub async fn vote(
        &self,
        voter_id: &str,
        dataset_id: &str,
        vote_type: VoteType,
    ) -> HiveResult<()> {
        sqlx::query(
            "INSERT INTO vote_edges (voter_id, dataset_id, vote_type, voted_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (voter_id, dataset_id)
             DO UPDATE SET vote_type = excluded.vote_type, voted_at = excluded.voted_at",
        )
        .bind(voter_id)
        .bind(dataset_id)
        .bind(vote_type)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(())
    }

    /// All voters with types and timestamps, most recent first
    pub async fn votes_for(&self, dataset_id: &str) -> HiveResult<Vec<VoteEntry>> {
        let votes = sqlx::query_as::<_, VoteEntry>(
            "SELECT voter_id, vote_type, voted_at FROM vote_edges
             WHERE dataset_id = ?1 ORDER BY voted_at DESC",
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(votes)
    }

    pub async fn count_votes(&self, dataset_id: &str) -> HiveResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vote_edges WHERE dataset_id = ?1")
                .bind(dataset_id)
                .fetch_one(&self.pool)
                .await
                .map_err(HiveError::from_graph)?;

        Ok(count)
    }

    // ==================== COMMENTED ====================

    /// Append a comment edge. Returns the generated id and timestamp so the
    /// caller can display the comment without a re-read.
    pub async fn comment(
        &self,
        user_id: &str,
        dataset_id: &str,
        content: &str,
    ) -> HiveResult<CommentEntry> {
        let entry = CommentEntry {
            comment_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            dataset_id: dataset_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
            hidden: false,
        };

        sqlx::query(
            "INSERT INTO comment_edges (comment_id, user_id, dataset_id, content, created_at, hidden)
             VALUES (?1, ?2, ?3, ?4, ?5, FALSE)",
        )
        .bind(&entry.comment_id)
        .bind(&entry.user_id)
        .bind(&entry.dataset_id)
        .bind(&entry.content)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(entry)
    }

    /// All non-hidden comments, most recent first
    pub async fn comments_for(&self, dataset_id: &str) -> HiveResult<Vec<CommentEntry>> {
        let comments = sqlx::query_as::<_, CommentEntry>(
            "SELECT * FROM comment_edges
             WHERE dataset_id = ?1 AND hidden = FALSE
             ORDER BY created_at DESC",
        )
        .bind(dataset_id)
        .fetch_all(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(comments)
    }

    /// Moderation soft-delete; no-op when the comment does not exist
    pub async fn hide_comment(&self, comment_id: &str) -> HiveResult<()> {
        sqlx::query("UPDATE comment_edges SET hidden = TRUE WHERE comment_id = ?1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(HiveError::from_graph)?;

        Ok(())
    }

    // ==================== MESSAGE ====================

    /// Append a message edge, sender -> receiver
    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        message_id: &str,
    ) -> HiveResult<MessageEntry> {
        let entry = MessageEntry {
            message_id: message_id.to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            sent_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO message_edges (message_id, sender_id, receiver_id, content, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&entry.message_id)
        .bind(&entry.sender_id)
        .bind(&entry.receiver_id)
        .bind(&entry.content)
        .bind(entry.sent_at)
        .execute(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(entry)
    }

    /// Every message between the two ids in either direction, ascending by
    /// timestamp. Sender and receiver are read off the edge direction.
    pub async fn conversation(&self, a: &str, b: &str) -> HiveResult<Vec<MessageEntry>> {
        let messages = sqlx::query_as::<_, MessageEntry>(
            "SELECT * FROM message_edges
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY sent_at ASC",
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(messages)
    }

    /// Existence check used to short-circuit conversation loads
    pub async fn has_messages(&self, a: &str, b: &str) -> HiveResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_edges
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await
        .map_err(HiveError::from_graph)?;

        Ok(count > 0)
    }
}

/// Create a SQLite connection pool with WAL journaling
pub async fn create_pool(path: &Path, max_connections: u32) -> HiveResult<SqlitePool> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HiveError::Internal(format!("Failed to create {:?}: {}", parent, e)))?;
    }

    let pool = sqlx::pool::PoolOptions::new()
        .max_connections(max_connections)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await
        .map_err(HiveError::from_graph)?;

    Ok(pool)
}

/// Run graph-store migrations, embedded at compile time
pub async fn run_migrations(pool: &SqlitePool) -> HiveResult<()> {
    sqlx::migrate!("./migrations/graph")
        .run(pool)
        .await
        .map_err(|e| HiveError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_graph() -> GraphStore {
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        GraphStore::new(pool)
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let graph = test_graph().await;

        for _ in 0..3 {
            graph.follow("u1", "u2").await.unwrap();
        }

        assert_eq!(graph.followers("u2").await.unwrap(), vec!["u1"]);
        assert_eq!(graph.count_followers("u2").await.unwrap(), 1);
        assert!(graph.is_following("u1", "u2").await.unwrap());
        // Direction matters
        assert!(!graph.is_following("u2", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unfollow_missing_edge_succeeds() {
        let graph = test_graph().await;

        graph.unfollow("u1", "u2").await.unwrap();
        assert!(graph.followers("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revote_overwrites_in_place() {
        let graph = test_graph().await;

        graph.vote("u1", "d1", VoteType::Up).await.unwrap();
        graph.vote("u1", "d1", VoteType::Down).await.unwrap();

        let votes = graph.votes_for("d1").await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].voter_id, "u1");
        assert_eq!(votes[0].vote_type, VoteType::Down);
        assert_eq!(graph.count_votes("d1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_votes_most_recent_first() {
        let graph = test_graph().await;

        graph.vote("u1", "d1", VoteType::Up).await.unwrap();
        graph.vote("u2", "d1", VoteType::Up).await.unwrap();
        graph.vote("u3", "d1", VoteType::Down).await.unwrap();

        let votes = graph.votes_for("d1").await.unwrap();
        let voters: Vec<&str> = votes.iter().map(|v| v.voter_id.as_str()).collect();
        assert_eq!(voters, vec!["u3", "u2", "u1"]);
    }

    #[tokio::test]
    async fn test_hidden_comments_are_filtered() {
        let graph = test_graph().await;

        let first = graph.comment("u1", "d1", "first").await.unwrap();
        let second = graph.comment("u2", "d1", "second").await.unwrap();
        assert_ne!(first.comment_id, second.comment_id);

        graph.hide_comment(&first.comment_id).await.unwrap();

        let visible = graph.comments_for("d1").await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].comment_id, second.comment_id);

        // Hiding an unknown id is a no-op
        graph.hide_comment("no-such-comment").await.unwrap();
    }

    #[tokio::test]
    async fn test_conversation_resolves_direction() {
        let graph = test_graph().await;

        graph.send_message("u1", "u2", "hi", "m1").await.unwrap();
        graph.send_message("u2", "u1", "hello back", "m2").await.unwrap();

        let convo = graph.conversation("u1", "u2").await.unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[0].sender_id, "u1");
        assert_eq!(convo[0].receiver_id, "u2");
        assert_eq!(convo[1].sender_id, "u2");
        assert_eq!(convo[1].receiver_id, "u1");

        // Same conversation from the other side
        let mirrored = graph.conversation("u2", "u1").await.unwrap();
        assert_eq!(mirrored, convo);

        assert!(graph.has_messages("u1", "u2").await.unwrap());
        assert!(!graph.has_messages("u2", "u3").await.unwrap());
    }

    #[tokio::test]
    async fn test_node_upserts_never_duplicate() {
        let graph = test_graph().await;

        graph.upsert_user_node("u1").await.unwrap();
        graph.upsert_user_node("u1").await.unwrap();
        graph.upsert_dataset_node("d1", "u1").await.unwrap();
        graph.upsert_dataset_node("d1", "someone-else").await.unwrap();

        // First owner wins; the repeated upsert is a match, not a rewrite
        let owner: String =
            sqlx::query_scalar("SELECT owner_id FROM dataset_nodes WHERE id = 'd1'")
                .fetch_one(graph.pool())
                .await
                .unwrap();
        assert_eq!(owner, "u1");
    }

    #[tokio::test]
    async fn test_created_edge_written_once() {
        let graph = test_graph().await;

        graph.mark_created("u1", "d1").await.unwrap();
        graph.mark_created("u1", "d1").await.unwrap();

        assert_eq!(graph.created_by("d1").await.unwrap().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_self_follow_is_not_rejected() {
        // Policy decision belongs to callers; the graph layer stores the edge.
        let graph = test_graph().await;

        graph.follow("u1", "u1").await.unwrap();
        assert!(graph.is_following("u1", "u1").await.unwrap());
    }
}
