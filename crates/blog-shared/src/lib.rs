pub mod api;
mod error;
mod models;

pub use error::*;
pub use models::*;
