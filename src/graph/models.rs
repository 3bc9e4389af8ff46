/// Edge attribute models returned by the graph adapter
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Vote direction carried on a VOTED edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

/// One voter's current vote on a dataset
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct VoteEntry {
    pub voter_id: String,
    pub vote_type: VoteType,
    pub voted_at: DateTime<Utc>,
}

/// A comment edge. `hidden` entries are filtered out of reads but the edge
/// itself is never removed.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CommentEntry {
    pub comment_id: String,
    pub user_id: String,
    pub dataset_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub hidden: bool,
}

/// A direct message edge. Sender and receiver come from the edge direction,
/// not from a stored role field.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MessageEntry {
    pub message_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}
