use axum::{extract::State, Extension};
use blog_shared::api::PostResponse;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::handlers::extract::{Json, Path};
use crate::routes::AppState;

/// POST /api/v1/ped/blogs/:id/like
pub async fn like_post(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostResponse>, AppError> {
    let post = state.posts.add_like(&user, post_id).await?;
    Ok(Json(PostResponse {
        message: "Blog liked successfully.".to_string(),
        post,
    }))
}

/// POST /api/v1/ped/blogs/:id/unlike
pub async fn unlike_post(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostResponse>, AppError> {
    let post = state.posts.remove_like(&user, post_id).await?;
    Ok(Json(PostResponse {
        message: "Blog unliked successfully.".to_string(),
        post,
    }))
}
