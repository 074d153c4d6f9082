use blog_shared::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // User ID
    pub username: String,
    #[serde(default)]
    pub role: Role,
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
}

/// Tokens are issued by the account service; this is used by tooling and tests.
pub fn create_access_token(
    user_id: Uuid,
    username: &str,
    role: &Role,
    secret: &str,
    expires_in_secs: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(expires_in_secs);

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role: role.clone(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create token: {}", e)))
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_with_their_role() {
        let id = Uuid::new_v4();
        let token = create_access_token(id, "ada", &Role::Admin, "secret", 60).unwrap();

        let claims = verify_access_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn rejects_bad_signatures_and_expired_tokens() {
        let id = Uuid::new_v4();
        let token = create_access_token(id, "ada", &Role::User, "secret", 60).unwrap();
        assert!(matches!(
            verify_access_token(&token, "other"),
            Err(AppError::Unauthorized)
        ));

        let expired = create_access_token(id, "ada", &Role::User, "secret", -600).unwrap();
        assert!(matches!(
            verify_access_token(&expired, "secret"),
            Err(AppError::Unauthorized)
        ));
    }
}
