use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Author;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Comment,
    Reply,
}

/// A comment or reply, stored flat with a link to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub kind: NodeKind,
    /// 1 for top-level comments, 2 for replies, 3 for replies to replies.
    pub depth: u8,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentNode {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A node together with its replies, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentNode,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of nodes in this thread, the root included.
    pub fn node_count(&self) -> usize {
        1 + self
            .replies
            .iter()
            .map(CommentThread::node_count)
            .sum::<usize>()
    }
}
