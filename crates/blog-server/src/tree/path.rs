use std::fmt;

use uuid::Uuid;

/// Ids from a top-level comment down to the addressed node.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath(Vec<Uuid>);

impl NodePath {
    pub fn comment(comment_id: Uuid) -> Self {
        Self(vec![comment_id])
    }

    pub fn reply(comment_id: Uuid, reply_id: Uuid) -> Self {
        Self(vec![comment_id, reply_id])
    }

    pub fn nested_reply(comment_id: Uuid, reply_id: Uuid, nested_id: Uuid) -> Self {
        Self(vec![comment_id, reply_id, nested_id])
    }

    pub fn child(&self, id: Uuid) -> Self {
        let mut segments = self.0.clone();
        segments.push(id);
        Self(segments)
    }

    pub fn segments(&self) -> &[Uuid] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}
