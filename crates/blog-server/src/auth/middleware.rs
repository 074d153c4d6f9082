use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use blog_shared::Role;
use uuid::Uuid;

use crate::{error::AppError, routes::AppState};

use super::jwt::verify_access_token;

/// Caller identity resolved from the access token.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    // Older clients send the bare token.
    let token = auth_header
        .strip_prefix("Bearer ")
        .unwrap_or(auth_header)
        .trim();
    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    let claims = verify_access_token(token, &state.config.jwt_secret)?;

    let principal = Principal {
        id: claims.sub,
        username: claims.username,
        role: claims.role,
    };

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
