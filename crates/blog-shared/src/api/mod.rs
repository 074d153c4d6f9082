mod comments;
mod posts;

pub use comments::*;
pub use posts::*;
