use async_trait::async_trait;
use blog_shared::{AssetRef, PostSummary};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{ListFilter, ListOrder, ListQuery, Page, PostPatch, PostStore, StoreError};
use crate::db::DbPool;
use crate::post::PostRecord;
use crate::tree::{CommentArena, LikeSet};

const POST_COLUMNS: &str = "id, writer_id, author, title, category, content, assets, \
     asset_revision, image, likes, comments, likes_count, comments_count, version, created_at, \
     updated_at";

const SUMMARY_COLUMNS: &str = "id, writer_id, author, title, category, image, likes_count, \
     comments_count, created_at, updated_at";

/// Comments, likes and asset refs live in JSONB columns next to the scalars.
pub struct PgPostStore {
    pool: DbPool,
}

impl PgPostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// A versioned write that matched no row either lost the race or targeted
    /// a deleted post.
    async fn missed(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError> {
        if self.exists(id).await? {
            Err(StoreError::VersionConflict)
        } else {
            Ok(None)
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    writer_id: Uuid,
    author: String,
    title: String,
    category: Option<String>,
    content: String,
    assets: Json<Vec<AssetRef>>,
    asset_revision: i64,
    image: Option<String>,
    likes: Json<LikeSet>,
    comments: Json<CommentArena>,
    likes_count: i64,
    comments_count: i64,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            writer_id: row.writer_id,
            author: row.author,
            title: row.title,
            category: row.category,
            content: row.content,
            assets: row.assets.0,
            asset_revision: row.asset_revision,
            image: row.image,
            likes: row.likes.0,
            comments: row.comments.0,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    writer_id: Uuid,
    author: String,
    title: String,
    category: Option<String>,
    image: Option<String>,
    likes_count: i64,
    comments_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SummaryRow> for PostSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            writer_id: row.writer_id,
            author: row.author,
            title: row.title,
            category: row.category,
            image: row.image,
            likes_count: row.likes_count,
            comments_count: row.comments_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn order_clause(order: ListOrder) -> &'static str {
    match order {
        ListOrder::Newest => "ORDER BY created_at DESC, id DESC",
        ListOrder::Popular => {
            "ORDER BY likes_count DESC, comments_count DESC, created_at DESC, id DESC"
        }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn find_one(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(PostRecord::from))
    }

    async fn insert(&self, post: &PostRecord) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        ))
        .bind(post.id)
        .bind(post.writer_id)
        .bind(&post.author)
        .bind(&post.title)
        .bind(&post.category)
        .bind(&post.content)
        .bind(Json(&post.assets))
        .bind(post.asset_revision)
        .bind(&post.image)
        .bind(Json(&post.likes))
        .bind(Json(&post.comments))
        .bind(post.likes_count)
        .bind(post.comments_count)
        .bind(post.version)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_whole(&self, post: &PostRecord) -> Result<Option<PostRecord>, StoreError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            r#"
            UPDATE posts
            SET title = $3, category = $4, content = $5, assets = $6, asset_revision = $7,
                image = $8, likes = $9, comments = $10, likes_count = $11,
                comments_count = $12, updated_at = $13, version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post.id)
        .bind(post.version)
        .bind(&post.title)
        .bind(&post.category)
        .bind(&post.content)
        .bind(Json(&post.assets))
        .bind(post.asset_revision)
        .bind(&post.image)
        .bind(Json(&post.likes))
        .bind(Json(&post.comments))
        .bind(post.likes_count)
        .bind(post.comments_count)
        .bind(post.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.into())),
            None => self.missed(post.id).await,
        }
    }

    async fn update_fields(
        &self,
        id: Uuid,
        patch: &PostPatch,
        expected_version: i64,
    ) -> Result<Option<PostRecord>, StoreError> {
        // $4 and $9 distinguish "leave the column alone" from "clear it".
        let row: Option<PostRow> = sqlx::query_as(&format!(
            r#"
            UPDATE posts
            SET title = COALESCE($3, title),
                category = CASE WHEN $4 THEN $5 ELSE category END,
                content = COALESCE($6, content),
                assets = COALESCE($7, assets),
                asset_revision = COALESCE($8, asset_revision),
                image = CASE WHEN $9 THEN $10 ELSE image END,
                updated_at = GREATEST(COALESCE($11, updated_at), created_at),
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected_version)
        .bind(&patch.title)
        .bind(patch.category.is_some())
        .bind(patch.category.clone().flatten())
        .bind(&patch.content)
        .bind(patch.assets.as_ref().map(Json))
        .bind(patch.asset_revision)
        .bind(patch.image.is_some())
        .bind(patch.image.clone().flatten())
        .bind(patch.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.into())),
            None => self.missed(id).await,
        }
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page, StoreError> {
        let (category, owner) = match &query.filter {
            ListFilter::All => (None, None),
            ListFilter::Category(category) => (Some(category.as_str()), None),
            ListFilter::Owner(owner) => (None, Some(*owner)),
        };
        let filter = "($1::text IS NULL OR category = $1) AND ($2::uuid IS NULL OR writer_id = $2)";

        let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM posts WHERE {filter}"))
            .bind(category)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM posts WHERE {filter} {} OFFSET $3 LIMIT $4",
            order_clause(query.order)
        ))
        .bind(category)
        .bind(owner)
        .bind(query.offset)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            posts: rows.into_iter().map(PostSummary::from).collect(),
            total,
        })
    }
}
