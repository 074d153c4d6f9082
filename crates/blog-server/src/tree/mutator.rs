use blog_shared::{Author, CommentNode, NodeKind};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CommentArena, NodePath, TreeError};
use crate::auth::Principal;

/// Top-level comment, reply, reply to a reply.
pub const DEFAULT_MAX_DEPTH: u8 = 3;

/// Passes when the principal owns the resource or holds an elevated role.
pub fn authorize_or_own(principal: &Principal, owner_id: Uuid) -> Result<(), TreeError> {
    if principal.id == owner_id || principal.role.is_elevated() {
        Ok(())
    } else {
        Err(TreeError::Forbidden)
    }
}

/// Applies comment operations to an arena, enforcing depth and ownership.
#[derive(Debug, Clone, Copy)]
pub struct TreeMutator {
    max_depth: u8,
}

impl Default for TreeMutator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl TreeMutator {
    pub fn new(max_depth: u8) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Adds a node under `parent`, or a top-level comment when `parent` is
    /// `None`. Returns the stored node.
    pub fn append(
        &self,
        arena: &mut CommentArena,
        parent: Option<&NodePath>,
        text: &str,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<CommentNode, TreeError> {
        if text.trim().is_empty() {
            return Err(TreeError::EmptyText);
        }

        let (parent_id, depth) = match parent {
            Some(path) => {
                let parent = arena.resolve(path)?;
                (Some(parent.id), parent.depth.saturating_add(1))
            }
            None => (None, 1),
        };
        if depth > self.max_depth {
            return Err(TreeError::DepthExceeded(self.max_depth));
        }

        let node = CommentNode {
            id: Uuid::new_v4(),
            parent_id,
            kind: if parent_id.is_some() {
                NodeKind::Reply
            } else {
                NodeKind::Comment
            },
            depth,
            author: Author {
                user_id: principal.id,
                username: principal.username.clone(),
            },
            text: text.to_string(),
            created_at: now,
            updated_at: now,
        };
        arena.push(node.clone());
        Ok(node)
    }

    /// Replaces the text of a node. Only its author may edit it.
    pub fn edit(
        &self,
        arena: &mut CommentArena,
        path: &NodePath,
        text: &str,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<CommentNode, TreeError> {
        if text.trim().is_empty() {
            return Err(TreeError::EmptyText);
        }

        let node = arena.resolve_mut(path)?;
        if node.author.user_id != principal.id {
            return Err(TreeError::Forbidden);
        }
        node.text = text.to_string();
        node.updated_at = now.max(node.created_at);
        Ok(node.clone())
    }

    /// Removes a node and its descendants. The author or an elevated role may
    /// delete.
    pub fn delete(
        &self,
        arena: &mut CommentArena,
        path: &NodePath,
        principal: &Principal,
    ) -> Result<Vec<CommentNode>, TreeError> {
        let node = arena.resolve(path)?;
        authorize_or_own(principal, node.author.user_id)?;
        let id = node.id;
        Ok(arena.remove_subtree(id))
    }
}
