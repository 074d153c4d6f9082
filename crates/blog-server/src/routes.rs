use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::auth::auth_middleware;
use crate::content::{BlobStore, FsBlobStore};
use crate::handlers::{comments as comment_handlers, likes as like_handlers, posts as post_handlers};
use crate::service::{PostService, ServiceOptions};
use crate::store::{MemoryPostStore, PgPostStore, PostStore};
use crate::{db, Config};

#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub config: Config,
}

impl AppState {
    /// Connects the configured stores. `DATABASE_URL=memory` skips Postgres.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn PostStore> = if config.uses_memory_store() {
            tracing::warn!("Using the in-memory post store; data is lost on restart");
            Arc::new(MemoryPostStore::new())
        } else {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await?;
            Arc::new(PgPostStore::new(pool))
        };
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(&config.asset_dir));

        Ok(Self::new(store, blobs, config))
    }

    pub fn new(store: Arc<dyn PostStore>, blobs: Arc<dyn BlobStore>, config: Config) -> Self {
        let options = ServiceOptions {
            max_thread_depth: config.max_thread_depth,
            max_retries: config.mutation_max_retries,
            seed_thread: config.seed_default_thread,
            asset_url_prefix: config.asset_url_prefix.clone(),
            fetch_remote_assets: config.fetch_remote_assets,
        };
        Self {
            posts: PostService::new(store, blobs, options),
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Public reads
    let public_routes = Router::new()
        .route("/blogs/paginated", get(post_handlers::list_paginated))
        .route("/blogs/by-category/:category", get(post_handlers::list_by_category))
        .route("/blogs/:id", get(post_handlers::get_post))
        .route("/top-blogs", get(post_handlers::top_posts));

    // Comment tree routes (nested under a post)
    let comment_routes = Router::new()
        .route("/", post(comment_handlers::add_comment))
        .route(
            "/:comment_id",
            put(comment_handlers::edit_comment)
                .delete(comment_handlers::delete_comment),
        )
        .route("/:comment_id/replies", post(comment_handlers::add_reply))
        .route(
            "/:comment_id/replies/:reply_id",
            post(comment_handlers::add_nested_reply)
                .put(comment_handlers::edit_reply)
                .delete(comment_handlers::delete_reply),
        )
        .route(
            "/:comment_id/replies/:reply_id/replies/:nested_id",
            put(comment_handlers::edit_nested_reply)
                .delete(comment_handlers::delete_nested_reply),
        );

    // Protected routes with auth middleware
    let protected_routes = Router::new()
        .route(
            "/blogs",
            post(post_handlers::create_post).get(post_handlers::list_posts),
        )
        .route("/blogs/by-owner/:id", get(post_handlers::list_by_owner))
        .route(
            "/blogs/:id",
            put(post_handlers::update_post).delete(post_handlers::delete_post),
        )
        .route("/blogs/:id/like", post(like_handlers::like_post))
        .route("/blogs/:id/unlike", post(like_handlers::unlike_post))
        .nest("/blogs/:id/comments", comment_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new().merge(public_routes).merge(protected_routes);

    // Combine all routes
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/ped", api_routes)
        .nest_service(
            &state.config.asset_url_prefix,
            ServeDir::new(&state.config.asset_dir),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
