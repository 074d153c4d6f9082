pub mod comments;
pub mod extract;
pub mod likes;
pub mod posts;
