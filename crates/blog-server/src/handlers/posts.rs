use axum::{extract::State, http::StatusCode, Extension};
use blog_shared::api::{
    CreatePostRequest, CreatePostResponse, ListMetadata, PageParams, PostListResponse,
    PostResponse, UpdatePostRequest,
};
use blog_shared::Post;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::handlers::extract::{Json, Path, Query};
use crate::routes::AppState;
use crate::service::PAGE_SIZE;
use crate::store::Page;

fn list_response(page: Page, message: &str, page_number: Option<u32>) -> PostListResponse {
    PostListResponse {
        metadata: ListMetadata {
            count: page.posts.len(),
            total: Some(page.total),
            page: page_number,
            message: message.to_string(),
            next_page: None,
        },
        posts: page.posts,
    }
}

/// POST /api/v1/ped/blogs
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<CreatePostResponse>), AppError> {
    let (post, assets) = state.posts.create_post(&user, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePostResponse {
            message: "Content created successfully.".to_string(),
            post,
            assets,
        }),
    ))
}

/// GET /api/v1/ped/blogs
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
) -> Result<Json<PostListResponse>, AppError> {
    let page = state.posts.list_all(&user).await?;
    Ok(Json(list_response(
        page,
        "List of all created blogs retrieved successfully.",
        None,
    )))
}

/// GET /api/v1/ped/blogs/paginated?page=
pub async fn list_paginated(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PostListResponse>, AppError> {
    let page_number = params.page.unwrap_or(1).max(1);
    let page = state.posts.list_page(page_number).await?;
    Ok(Json(list_response(
        page,
        "List of all created blogs retrieved successfully.",
        Some(page_number),
    )))
}

/// GET /api/v1/ped/top-blogs
pub async fn top_posts(State(state): State<AppState>) -> Result<Json<PostListResponse>, AppError> {
    let page = state.posts.top_posts().await?;
    Ok(Json(list_response(
        page,
        "Top 10 blogs with most likes and comments retrieved successfully.",
        None,
    )))
}

/// GET /api/v1/ped/blogs/by-category/:category?page=&limit=
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<PostListResponse>, AppError> {
    let page_number = params.page.unwrap_or(1).max(1);
    let page = state
        .posts
        .list_by_category(&category, page_number, params.limit.unwrap_or(PAGE_SIZE))
        .await?;
    Ok(Json(list_response(
        page,
        "Blogs retrieved successfully.",
        Some(page_number),
    )))
}

/// GET /api/v1/ped/blogs/by-owner/:id?page=
pub async fn list_by_owner(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(owner_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<PostListResponse>, AppError> {
    let page_number = params.page.unwrap_or(1).max(1);
    let page = state.posts.list_by_owner(&user, owner_id, page_number).await?;
    let has_more = i64::from(page_number) * i64::from(PAGE_SIZE) < page.total;

    let mut response = list_response(
        page,
        "Blogs retrieved successfully for this owner.",
        Some(page_number),
    );
    if has_more {
        response.metadata.next_page = Some(format!(
            "/api/v1/ped/blogs/by-owner/{}?page={}",
            owner_id,
            page_number + 1
        ));
    }
    Ok(Json(response))
}

/// GET /api/v1/ped/blogs/:id
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Post>, AppError> {
    let post = state.posts.get_post(id).await?;
    Ok(Json(post))
}

/// PUT /api/v1/ped/blogs/:id
pub async fn update_post(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, AppError> {
    if req.is_empty() {
        return Err(AppError::Validation("Invalid update data".to_string()));
    }

    let post = state.posts.update_post(&user, id, req).await?;
    Ok(Json(PostResponse {
        message: "Blog updated successfully.".to_string(),
        post,
    }))
}

/// DELETE /api/v1/ped/blogs/:id
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.posts.delete_post(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
