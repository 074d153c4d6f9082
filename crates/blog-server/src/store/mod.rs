//! Document store for posts.
//!
//! Writes are versioned: a write names the version it was computed from and
//! fails with [`StoreError::VersionConflict`] when another write got there
//! first. Successful writes bump the version by one.

mod memory;
mod postgres;

pub use memory::MemoryPostStore;
pub use postgres::PgPostStore;

use async_trait::async_trait;
use blog_shared::{AssetRef, PostSummary};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::post::PostRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("post was modified concurrently")]
    VersionConflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Scalar fields of a post update. `None` leaves a field unchanged;
/// `Some(None)` clears `category` or `image`.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub category: Option<Option<String>>,
    pub content: Option<String>,
    pub assets: Option<Vec<AssetRef>>,
    pub asset_revision: Option<i64>,
    pub image: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PostPatch {
    pub fn apply(&self, post: &mut PostRecord) {
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(category) = &self.category {
            post.category = category.clone();
        }
        if let Some(content) = &self.content {
            post.content = content.clone();
        }
        if let Some(assets) = &self.assets {
            post.assets = assets.clone();
        }
        if let Some(revision) = self.asset_revision {
            post.asset_revision = revision;
        }
        if let Some(image) = &self.image {
            post.image = image.clone();
        }
        if let Some(now) = self.updated_at {
            post.touch(now);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    All,
    /// Lowercase category.
    Category(String),
    Owner(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    /// `created_at` descending.
    Newest,
    /// `likes_count`, then `comments_count`, both descending.
    Popular,
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filter: ListFilter,
    pub order: ListOrder,
    pub offset: i64,
    /// `None` returns every remaining post.
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn new(filter: ListFilter, order: ListOrder) -> Self {
        Self {
            filter,
            order,
            offset: 0,
            limit: None,
        }
    }

    /// 1-based page of `per_page` posts.
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.offset = i64::from(page.max(1) - 1) * i64::from(per_page);
        self.limit = Some(i64::from(per_page));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub posts: Vec<PostSummary>,
    /// Number of posts matching the filter, ignoring offset and limit.
    pub total: i64,
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn find_one(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError>;

    async fn insert(&self, post: &PostRecord) -> Result<(), StoreError>;

    /// Replaces the whole document if its stored version still equals
    /// `post.version`. Returns `None` when the post no longer exists.
    async fn update_whole(&self, post: &PostRecord) -> Result<Option<PostRecord>, StoreError>;

    /// Applies `patch` if the stored version equals `expected_version`.
    /// Returns `None` when the post no longer exists.
    async fn update_fields(
        &self,
        id: Uuid,
        patch: &PostPatch,
        expected_version: i64,
    ) -> Result<Option<PostRecord>, StoreError>;

    /// Returns the number of deleted posts.
    async fn delete(&self, id: Uuid) -> Result<u64, StoreError>;

    async fn list(&self, query: &ListQuery) -> Result<Page, StoreError>;
}
