use std::{cmp::Reverse, collections::HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ListFilter, ListOrder, ListQuery, Page, PostPatch, PostStore, StoreError};
use crate::post::PostRecord;

/// Process-local store, selected with `DATABASE_URL=memory` and used in tests.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: RwLock<HashMap<Uuid, PostRecord>>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn find_one(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn insert(&self, post: &PostRecord) -> Result<(), StoreError> {
        self.posts.write().await.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_whole(&self, post: &PostRecord) -> Result<Option<PostRecord>, StoreError> {
        let mut posts = self.posts.write().await;
        let Some(stored) = posts.get_mut(&post.id) else {
            return Ok(None);
        };
        if stored.version != post.version {
            return Err(StoreError::VersionConflict);
        }
        *stored = post.clone();
        stored.version += 1;
        Ok(Some(stored.clone()))
    }

    async fn update_fields(
        &self,
        id: Uuid,
        patch: &PostPatch,
        expected_version: i64,
    ) -> Result<Option<PostRecord>, StoreError> {
        let mut posts = self.posts.write().await;
        let Some(stored) = posts.get_mut(&id) else {
            return Ok(None);
        };
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict);
        }
        patch.apply(stored);
        stored.version += 1;
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        Ok(self.posts.write().await.remove(&id).map_or(0, |_| 1))
    }

    async fn list(&self, query: &ListQuery) -> Result<Page, StoreError> {
        let posts = self.posts.read().await;
        let mut matching: Vec<&PostRecord> = posts
            .values()
            .filter(|post| match &query.filter {
                ListFilter::All => true,
                ListFilter::Category(category) => post.category.as_ref() == Some(category),
                ListFilter::Owner(owner) => post.writer_id == *owner,
            })
            .collect();

        match query.order {
            ListOrder::Newest => matching.sort_by_key(|p| Reverse((p.created_at, p.id))),
            ListOrder::Popular => matching.sort_by_key(|p| {
                Reverse((p.likes_count, p.comments_count, p.created_at, p.id))
            }),
        }

        let total = matching.len() as i64;
        let limit = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        let posts = matching
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(limit)
            .map(PostRecord::to_summary)
            .collect();

        Ok(Page { posts, total })
    }
}
