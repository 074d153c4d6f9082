//! Post operations on top of the store.
//!
//! Every tree or like mutation runs as load, mutate in memory, versioned
//! write. A write that loses the race is recomputed from a fresh load, so two
//! concurrent writers never overwrite each other's changes.

use std::sync::Arc;

use blog_shared::{
    api::{CreatePostRequest, UpdatePostRequest},
    AssetReport, CommentNode, Post,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::Principal;
use crate::content::{
    decode_image, AssetPersister, BlobStore, ContentPipeline, ImageUpload, Sanitizer,
};
use crate::error::AppError;
use crate::post::{normalize_category, PostRecord, FIRST_VERSION};
use crate::store::{ListFilter, ListOrder, ListQuery, Page, PostPatch, PostStore, StoreError};
use crate::tree::{authorize_or_own, NodePath, TreeMutator, DEFAULT_MAX_DEPTH};

pub const PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const TOP_POSTS: i64 = 10;

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub max_thread_depth: u8,
    pub max_retries: u32,
    pub seed_thread: bool,
    pub asset_url_prefix: String,
    pub fetch_remote_assets: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_thread_depth: DEFAULT_MAX_DEPTH,
            max_retries: 8,
            seed_thread: true,
            asset_url_prefix: "/blogImages".to_string(),
            fetch_remote_assets: false,
        }
    }
}

fn decode_cover(uri: &str) -> Result<ImageUpload, AppError> {
    decode_image(uri).map_err(|reason| AppError::Validation(format!("Invalid image: {reason}")))
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    mutator: TreeMutator,
    pipeline: ContentPipeline,
    persister: AssetPersister,
    max_retries: u32,
    seed_thread: bool,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>, blobs: Arc<dyn BlobStore>, options: ServiceOptions) -> Self {
        let http = options.fetch_remote_assets.then(reqwest::Client::new);
        Self {
            store,
            mutator: TreeMutator::new(options.max_thread_depth),
            pipeline: ContentPipeline::new(Sanitizer::default(), &options.asset_url_prefix),
            persister: AssetPersister::new(blobs, http),
            max_retries: options.max_retries.max(1),
            seed_thread: options.seed_thread,
        }
    }

    async fn load(&self, id: Uuid) -> Result<PostRecord, AppError> {
        self.store
            .find_one(id)
            .await?
            .ok_or(AppError::NotFound("Post not found"))
    }

    /// Runs `apply` against a fresh copy of the post until the versioned write
    /// lands. Errors from `apply` abort without writing.
    async fn mutate<T, F>(&self, id: Uuid, mut apply: F) -> Result<(PostRecord, T), AppError>
    where
        T: Send,
        F: FnMut(&mut PostRecord, DateTime<Utc>) -> Result<T, AppError> + Send,
    {
        for attempt in 1..=self.max_retries {
            let mut post = self.load(id).await?;
            let now = Utc::now();
            let output = apply(&mut post, now)?;
            post.refresh_counters();
            post.touch(now);

            match self.store.update_whole(&post).await {
                Ok(Some(saved)) => return Ok((saved, output)),
                Ok(None) => return Err(AppError::NotFound("Post not found")),
                Err(StoreError::VersionConflict) => {
                    tracing::debug!(post_id = %id, attempt, "Version conflict, retrying mutation");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(post_id = %id, retries = self.max_retries, "Giving up on contended post");
        Err(AppError::Contention)
    }

    // --- posts ---

    pub async fn create_post(
        &self,
        writer: &Principal,
        req: CreatePostRequest,
    ) -> Result<(Post, AssetReport), AppError> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        let image = req.image.as_deref().map(decode_cover).transpose()?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let extraction = self.pipeline.process(id, FIRST_VERSION, &req.content);
        let mut post = PostRecord::new(
            id,
            writer,
            title.to_string(),
            req.category,
            extraction.markup,
            extraction.assets.iter().map(|a| a.to_ref()).collect(),
            now,
        );
        let cover = image.map(|image| {
            let path = ContentPipeline::cover_path(id, FIRST_VERSION, &image.extension);
            (path, image)
        });
        post.image = cover.as_ref().map(|(path, _)| self.pipeline.public_url(path));
        if self.seed_thread {
            post.seed_thread(&self.mutator, now)?;
        }

        self.store.insert(&post).await?;
        tracing::info!(post_id = %id, writer = %writer.id, assets = extraction.assets.len(), "Post created");

        let dir = ContentPipeline::asset_dir(id, post.asset_revision);
        let mut report = self.persister.persist(&dir, &extraction.assets).await;
        if let Some((path, image)) = cover {
            self.persister.persist_image(path, &image, &mut report).await;
        }
        Ok((post.to_post(), report))
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Post, AppError> {
        Ok(self.load(id).await?.to_post())
    }

    /// Owner or admin. New content is sanitized and its assets re-extracted;
    /// the previous assets or cover of the post are replaced.
    ///
    /// Blobs are keyed by the version the update writes, so only the writer
    /// that won that version stores into its paths.
    pub async fn update_post(
        &self,
        principal: &Principal,
        id: Uuid,
        req: UpdatePostRequest,
    ) -> Result<Post, AppError> {
        let title = match req.title.as_deref().map(str::trim) {
            Some("") => return Err(AppError::Validation("Title cannot be empty".to_string())),
            title => title.map(str::to_string),
        };
        let category = req.category.as_deref().map(normalize_category);
        let image = match req.image.as_deref() {
            None => None,
            Some("") => Some(None),
            Some(uri) => Some(Some(decode_cover(uri)?)),
        };

        for attempt in 1..=self.max_retries {
            let current = self.load(id).await?;
            authorize_or_own(principal, current.writer_id)?;

            let revision = current.version + 1;
            let extraction = req
                .content
                .as_deref()
                .map(|raw| self.pipeline.process(id, revision, raw));
            let cover = image.as_ref().map(|change| {
                change.as_ref().map(|image| {
                    (ContentPipeline::cover_path(id, revision, &image.extension), image)
                })
            });
            let patch = PostPatch {
                title: title.clone(),
                category: category.clone(),
                content: extraction.as_ref().map(|e| e.markup.clone()),
                assets: extraction
                    .as_ref()
                    .map(|e| e.assets.iter().map(|a| a.to_ref()).collect()),
                asset_revision: extraction.is_some().then_some(revision),
                image: cover.as_ref().map(|change| {
                    change.as_ref().map(|(path, _)| self.pipeline.public_url(path))
                }),
                updated_at: Some(Utc::now()),
            };

            match self.store.update_fields(id, &patch, current.version).await {
                Ok(Some(saved)) => {
                    let mut report = AssetReport::default();
                    if let Some(extraction) = &extraction {
                        let dir = ContentPipeline::asset_dir(id, revision);
                        report = self.persister.persist(&dir, &extraction.assets).await;
                        self.persister
                            .discard(&ContentPipeline::asset_dir(id, current.asset_revision))
                            .await;
                    }
                    if let Some(change) = cover {
                        if let Some((path, image)) = change {
                            self.persister.persist_image(path, image, &mut report).await;
                        }
                        let old = current.image.as_deref().and_then(|url| self.pipeline.blob_path(url));
                        if let Some(old) = old {
                            self.persister.remove(old).await;
                        }
                    }
                    self.drop_superseded(&saved).await;

                    if !report.is_complete() {
                        tracing::warn!(
                            post_id = %id,
                            failed = report.failed.len(),
                            "Post updated with missing assets"
                        );
                    }
                    tracing::info!(post_id = %id, version = saved.version, "Post updated");
                    return Ok(saved.to_post());
                }
                Ok(None) => return Err(AppError::NotFound("Post not found")),
                Err(StoreError::VersionConflict) => {
                    tracing::debug!(post_id = %id, attempt, "Version conflict, retrying update");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Contention)
    }

    /// Removes blobs referenced by `saved` that a later write replaced or
    /// deleted while they were being stored.
    async fn drop_superseded(&self, saved: &PostRecord) {
        let latest = match self.store.find_one(saved.id).await {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                self.persister.discard(&saved.id.to_string()).await;
                return;
            }
            Err(e) => {
                tracing::warn!(post_id = %saved.id, "Could not re-read post after update: {}", e);
                return;
            }
        };
        if latest.asset_revision != saved.asset_revision {
            self.persister
                .discard(&ContentPipeline::asset_dir(saved.id, saved.asset_revision))
                .await;
        }
        if latest.image != saved.image {
            let path = saved.image.as_deref().and_then(|url| self.pipeline.blob_path(url));
            if let Some(path) = path {
                self.persister.remove(path).await;
            }
        }
    }

    /// Owner or admin. Comments, likes and stored assets go with the post.
    pub async fn delete_post(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        let post = self.load(id).await?;
        authorize_or_own(principal, post.writer_id)?;

        if self.store.delete(id).await? == 0 {
            return Err(AppError::NotFound("Post not found"));
        }
        self.persister.discard(&id.to_string()).await;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    // --- listings ---

    fn require_admin(principal: &Principal) -> Result<(), AppError> {
        if principal.role.is_elevated() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Admin only.
    pub async fn list_all(&self, principal: &Principal) -> Result<Page, AppError> {
        Self::require_admin(principal)?;
        let query = ListQuery::new(ListFilter::All, ListOrder::Newest);
        Ok(self.store.list(&query).await?)
    }

    pub async fn list_page(&self, page: u32) -> Result<Page, AppError> {
        let query = ListQuery::new(ListFilter::All, ListOrder::Newest).page(page, PAGE_SIZE);
        Ok(self.store.list(&query).await?)
    }

    pub async fn list_by_category(
        &self,
        category: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page, AppError> {
        let category = normalize_category(category)
            .ok_or_else(|| AppError::Validation("Category is required".to_string()))?;
        let query = ListQuery::new(ListFilter::Category(category), ListOrder::Newest)
            .page(page, per_page.clamp(1, MAX_PAGE_SIZE));
        let found = self.store.list(&query).await?;
        if found.posts.is_empty() {
            return Err(AppError::NotFound("No posts found in this category"));
        }
        Ok(found)
    }

    pub async fn top_posts(&self) -> Result<Page, AppError> {
        let mut query = ListQuery::new(ListFilter::All, ListOrder::Popular);
        query.limit = Some(TOP_POSTS);
        Ok(self.store.list(&query).await?)
    }

    /// Admin only.
    pub async fn list_by_owner(
        &self,
        principal: &Principal,
        owner_id: Uuid,
        page: u32,
    ) -> Result<Page, AppError> {
        Self::require_admin(principal)?;
        let query = ListQuery::new(ListFilter::Owner(owner_id), ListOrder::Newest).page(page, PAGE_SIZE);
        Ok(self.store.list(&query).await?)
    }

    // --- comment tree ---

    async fn append(
        &self,
        principal: &Principal,
        post_id: Uuid,
        parent: Option<NodePath>,
        text: &str,
    ) -> Result<(Post, CommentNode), AppError> {
        let (saved, node) = self
            .mutate(post_id, |post, now| {
                Ok(self
                    .mutator
                    .append(&mut post.comments, parent.as_ref(), text, principal, now)?)
            })
            .await?;
        tracing::debug!(%post_id, node_id = %node.id, depth = node.depth, "Comment node added");
        Ok((saved.to_post(), node))
    }

    pub async fn append_comment(
        &self,
        principal: &Principal,
        post_id: Uuid,
        text: &str,
    ) -> Result<(Post, CommentNode), AppError> {
        self.append(principal, post_id, None, text).await
    }

    pub async fn append_reply(
        &self,
        principal: &Principal,
        post_id: Uuid,
        comment_id: Uuid,
        text: &str,
    ) -> Result<(Post, CommentNode), AppError> {
        self.append(principal, post_id, Some(NodePath::comment(comment_id)), text)
            .await
    }

    pub async fn append_reply_to_reply(
        &self,
        principal: &Principal,
        post_id: Uuid,
        comment_id: Uuid,
        reply_id: Uuid,
        text: &str,
    ) -> Result<(Post, CommentNode), AppError> {
        self.append(principal, post_id, Some(NodePath::reply(comment_id, reply_id)), text)
            .await
    }

    /// Author only, at any depth.
    pub async fn edit_node(
        &self,
        principal: &Principal,
        post_id: Uuid,
        path: &NodePath,
        text: &str,
    ) -> Result<Post, AppError> {
        let (saved, _) = self
            .mutate(post_id, |post, now| {
                Ok(self.mutator.edit(&mut post.comments, path, text, principal, now)?)
            })
            .await?;
        Ok(saved.to_post())
    }

    /// Author or admin; descendants are removed with the node.
    pub async fn delete_node(
        &self,
        principal: &Principal,
        post_id: Uuid,
        path: &NodePath,
    ) -> Result<Post, AppError> {
        let (saved, removed) = self
            .mutate(post_id, |post, _| {
                Ok(self.mutator.delete(&mut post.comments, path, principal)?)
            })
            .await?;
        tracing::debug!(%post_id, path = %path, removed = removed.len(), "Comment subtree removed");
        Ok(saved.to_post())
    }

    // --- likes ---

    pub async fn add_like(&self, principal: &Principal, post_id: Uuid) -> Result<Post, AppError> {
        let (saved, _) = self
            .mutate(post_id, |post, now| Ok(post.likes.add(principal, now)?))
            .await?;
        Ok(saved.to_post())
    }

    pub async fn remove_like(&self, principal: &Principal, post_id: Uuid) -> Result<Post, AppError> {
        let (saved, _) = self
            .mutate(post_id, |post, _| Ok(post.likes.remove(principal)?))
            .await?;
        Ok(saved.to_post())
    }
}
