use axum::{extract::FromRequestParts, http::request::Parts, Extension};

use crate::error::AppError;
use crate::repositories::{SessionRepository, UserRepository};
use crate::session::get_session_token;

/// Repositories the extractor needs, installed as an `Extension` layer.
#[derive(Clone)]
pub struct AuthContext {
    pub sessions: SessionRepository,
    pub users: UserRepository,
}

/// The user behind a valid session token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(auth) = Extension::<AuthContext>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Internal(format!("Auth context missing: {}", e)))?;

        let token = get_session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let user_id = auth
            .sessions
            .find_valid(&token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let user = auth
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            token,
        })
    }
}
