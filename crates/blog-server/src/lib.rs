//! Blog post server: content sanitization, comment threads and likes.

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod handlers;
pub mod post;
pub mod routes;
pub mod service;
pub mod store;
pub mod tree;

pub use config::Config;
pub use db::DbPool;
pub use error::AppError;
pub use routes::{create_router, AppState};
