use std::collections::{HashMap, HashSet};

use blog_shared::{CommentNode, CommentThread};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{NodePath, TreeError};

/// Flat, insertion-ordered node table with an id index.
///
/// A parent is always stored before its children, which lets subtree removal
/// and thread reconstruction run in one forward pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CommentNode>", into = "Vec<CommentNode>")]
pub struct CommentArena {
    nodes: Vec<CommentNode>,
    index: HashMap<Uuid, usize>,
}

impl From<Vec<CommentNode>> for CommentArena {
    fn from(nodes: Vec<CommentNode>) -> Self {
        let mut arena = Self {
            nodes,
            index: HashMap::new(),
        };
        arena.reindex();
        arena
    }
}

impl From<CommentArena> for Vec<CommentNode> {
    fn from(arena: CommentArena) -> Self {
        arena.nodes
    }
}

impl CommentArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[CommentNode] {
        &self.nodes
    }

    pub fn get(&self, id: Uuid) -> Option<&CommentNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn top_level_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_top_level()).count()
    }

    /// Walks `path` hop by hop: the first id must be a top-level comment and
    /// every following id a direct child of the previous one.
    pub fn resolve(&self, path: &NodePath) -> Result<&CommentNode, TreeError> {
        let mut parent = None;
        let mut found = None;
        for (hop, &id) in path.segments().iter().enumerate() {
            let missing = if hop == 0 {
                TreeError::CommentNotFound
            } else {
                TreeError::ReplyNotFound
            };
            let node = self
                .get(id)
                .filter(|node| node.parent_id == parent)
                .ok_or(missing)?;
            parent = Some(node.id);
            found = Some(node);
        }
        found.ok_or(TreeError::CommentNotFound)
    }

    pub(super) fn resolve_mut(&mut self, path: &NodePath) -> Result<&mut CommentNode, TreeError> {
        let id = self.resolve(path)?.id;
        let i = self.index[&id];
        Ok(&mut self.nodes[i])
    }

    /// Appends a node whose parent, if any, is already present.
    pub(super) fn push(&mut self, node: CommentNode) {
        debug_assert!(node.parent_id.map_or(true, |p| self.index.contains_key(&p)));
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Removes the node and all of its descendants, returning them in their
    /// stored order.
    pub(super) fn remove_subtree(&mut self, id: Uuid) -> Vec<CommentNode> {
        if !self.index.contains_key(&id) {
            return Vec::new();
        }
        let mut doomed = HashSet::from([id]);
        for node in &self.nodes {
            if node.parent_id.is_some_and(|p| doomed.contains(&p)) {
                doomed.insert(node.id);
            }
        }
        let (removed, kept) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|node| doomed.contains(&node.id));
        self.nodes = kept;
        self.reindex();
        removed
    }

    /// Rebuilds the nested view with a single indexed pass over the arena.
    pub fn threads(&self) -> Vec<CommentThread> {
        let mut children: HashMap<Option<Uuid>, Vec<usize>> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            children.entry(node.parent_id).or_default().push(i);
        }
        self.build(&children, None)
    }

    fn build(
        &self,
        children: &HashMap<Option<Uuid>, Vec<usize>>,
        parent: Option<Uuid>,
    ) -> Vec<CommentThread> {
        children
            .get(&parent)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| {
                        let node = &self.nodes[i];
                        CommentThread {
                            comment: node.clone(),
                            replies: self.build(children, Some(node.id)),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use blog_shared::{Author, NodeKind};
    use chrono::Utc;

    use super::*;

    fn node(id: u128, parent: Option<u128>, depth: u8) -> CommentNode {
        let now = Utc::now();
        CommentNode {
            id: Uuid::from_u128(id),
            parent_id: parent.map(Uuid::from_u128),
            kind: if parent.is_some() {
                NodeKind::Reply
            } else {
                NodeKind::Comment
            },
            depth,
            author: Author::system("tester"),
            text: format!("node {id}"),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> CommentArena {
        CommentArena::from(vec![
            node(1, None, 1),
            node(2, Some(1), 2),
            node(3, Some(2), 3),
            node(4, None, 1),
            node(5, Some(1), 2),
        ])
    }

    #[test]
    fn rebuilds_threads_in_insertion_order() {
        let threads = sample().threads();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, Uuid::from_u128(1));
        let replies: Vec<Uuid> = threads[0].replies.iter().map(|r| r.comment.id).collect();
        assert_eq!(replies, vec![Uuid::from_u128(2), Uuid::from_u128(5)]);
        assert_eq!(threads[0].replies[0].replies[0].comment.id, Uuid::from_u128(3));
        assert_eq!(threads[0].node_count(), 4);
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn resolves_only_consistent_paths() {
        let arena = sample();
        let (c1, r2, n3, c4) = (
            Uuid::from_u128(1),
            Uuid::from_u128(2),
            Uuid::from_u128(3),
            Uuid::from_u128(4),
        );

        assert_eq!(arena.resolve(&NodePath::nested_reply(c1, r2, n3)).unwrap().id, n3);
        // reply addressed as a top-level comment
        assert_eq!(
            arena.resolve(&NodePath::comment(r2)),
            Err(TreeError::CommentNotFound)
        );
        // reply under the wrong comment
        assert_eq!(
            arena.resolve(&NodePath::reply(c4, r2)),
            Err(TreeError::ReplyNotFound)
        );
        assert_eq!(
            arena.resolve(&NodePath::reply(c1, Uuid::from_u128(99))),
            Err(TreeError::ReplyNotFound)
        );
    }

    #[test]
    fn removing_a_comment_removes_its_subtree() {
        let mut arena = sample();

        let removed = arena.remove_subtree(Uuid::from_u128(1));

        assert_eq!(removed.len(), 4);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.top_level_count(), 1);
        assert!(arena.get(Uuid::from_u128(3)).is_none());
        assert_eq!(arena.get(Uuid::from_u128(4)).unwrap().id, Uuid::from_u128(4));
    }

    #[test]
    fn serializes_as_a_flat_node_list() {
        let arena = sample();
        let json = serde_json::to_value(&arena).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 5);

        let back: CommentArena = serde_json::from_value(json).unwrap();
        assert_eq!(back, arena);
        assert!(back.get(Uuid::from_u128(5)).is_some());
    }
}
