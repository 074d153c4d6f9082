//! Comment tree and like set of a single post.
//!
//! Nodes are kept in a flat arena keyed by id, each carrying its parent id;
//! nested threads are rebuilt only when a post is rendered. Everything here is
//! synchronous and operates on an in-memory copy; persistence and the retry
//! protocol live in the service layer.

mod arena;
mod likes;
mod mutator;
mod path;

pub use arena::CommentArena;
pub use likes::LikeSet;
pub use mutator::{authorize_or_own, TreeMutator, DEFAULT_MAX_DEPTH};
pub use path::NodePath;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Comment not found")]
    CommentNotFound,

    #[error("Reply not found")]
    ReplyNotFound,

    #[error("You don't have the required privileges for this comment")]
    Forbidden,

    #[error("Replies cannot be nested more than {0} levels deep")]
    DepthExceeded(u8),

    #[error("Comment text is required")]
    EmptyText,

    #[error("You have already liked this blog.")]
    AlreadyLiked,

    #[error("You have not liked this blog.")]
    NotLiked,
}
