mod asset;
mod comment;
mod like;
mod post;
mod user;

pub use asset::*;
pub use comment::*;
pub use like::*;
pub use post::*;
pub use user::*;
