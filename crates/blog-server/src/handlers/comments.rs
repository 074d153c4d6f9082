use axum::{extract::State, Extension};
use blog_shared::api::{CommentRequest, PostResponse};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::AppError;
use crate::handlers::extract::{Json, Path};
use crate::routes::AppState;
use crate::tree::NodePath;

fn respond(message: &str, post: blog_shared::Post) -> Json<PostResponse> {
    Json(PostResponse {
        message: message.to_string(),
        post,
    })
}

/// POST /api/v1/ped/blogs/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let (post, _) = state.posts.append_comment(&user, post_id, &req.text).await?;
    Ok(respond("Comment added successfully.", post))
}

/// PUT /api/v1/ped/blogs/:id/comments/:comment_id
pub async fn edit_comment(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let path = NodePath::comment(comment_id);
    let post = state.posts.edit_node(&user, post_id, &path, &req.text).await?;
    Ok(respond("Comment updated successfully.", post))
}

/// DELETE /api/v1/ped/blogs/:id/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<PostResponse>, AppError> {
    let path = NodePath::comment(comment_id);
    let post = state.posts.delete_node(&user, post_id, &path).await?;
    Ok(respond("Comment deleted successfully.", post))
}

/// POST /api/v1/ped/blogs/:id/comments/:comment_id/replies
pub async fn add_reply(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let (post, _) = state
        .posts
        .append_reply(&user, post_id, comment_id, &req.text)
        .await?;
    Ok(respond("Reply added successfully.", post))
}

/// PUT /api/v1/ped/blogs/:id/comments/:comment_id/replies/:reply_id
pub async fn edit_reply(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let path = NodePath::reply(comment_id, reply_id);
    let post = state.posts.edit_node(&user, post_id, &path, &req.text).await?;
    Ok(respond("Reply edited successfully.", post))
}

/// DELETE /api/v1/ped/blogs/:id/comments/:comment_id/replies/:reply_id
pub async fn delete_reply(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<Json<PostResponse>, AppError> {
    let path = NodePath::reply(comment_id, reply_id);
    let post = state.posts.delete_node(&user, post_id, &path).await?;
    Ok(respond("Reply deleted successfully.", post))
}

/// POST /api/v1/ped/blogs/:id/comments/:comment_id/replies/:reply_id
pub async fn add_nested_reply(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id, reply_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let (post, _) = state
        .posts
        .append_reply_to_reply(&user, post_id, comment_id, reply_id, &req.text)
        .await?;
    Ok(respond("Replied to the reply successfully.", post))
}

/// PUT /api/v1/ped/blogs/:id/comments/:comment_id/replies/:reply_id/replies/:nested_id
pub async fn edit_nested_reply(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id, reply_id, nested_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<PostResponse>, AppError> {
    let path = NodePath::nested_reply(comment_id, reply_id, nested_id);
    let post = state.posts.edit_node(&user, post_id, &path, &req.text).await?;
    Ok(respond("Reply edited successfully.", post))
}

/// DELETE /api/v1/ped/blogs/:id/comments/:comment_id/replies/:reply_id/replies/:nested_id
pub async fn delete_nested_reply(
    State(state): State<AppState>,
    Extension(user): Extension<Principal>,
    Path((post_id, comment_id, reply_id, nested_id)): Path<(Uuid, Uuid, Uuid, Uuid)>,
) -> Result<Json<PostResponse>, AppError> {
    let path = NodePath::nested_reply(comment_id, reply_id, nested_id);
    let post = state.posts.delete_node(&user, post_id, &path).await?;
    Ok(respond("Reply deleted successfully.", post))
}
