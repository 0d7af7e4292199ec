use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::CookieJar;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CreateUser, LoginCredentials, User};
use crate::repositories::{SessionRepository, UserRepository};
use crate::session::{create_session_cookie, remove_session_cookie};

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Clone)]
pub struct AuthState {
    pub user_repo: UserRepository,
    pub session_repo: SessionRepository,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

async fn start_session(
    state: &AuthState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = state.session_repo.create(&user.id).await?;
    let jar = jar.add(create_session_cookie(&token, state.session_repo.ttl()));
    Ok((jar, Json(SessionResponse { user, token })))
}

pub async fn register(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(form): Json<CreateUser>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let username = form.username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if state.user_repo.find_by_username(username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let user = state.user_repo.create(username, &form.password).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let (jar, body) = start_session(&state, jar, user).await?;
    Ok((StatusCode::CREATED, jar, body))
}

pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(credentials): Json<LoginCredentials>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let user = state
        .user_repo
        .verify_password(credentials.username.trim(), &credentials.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    start_session(&state, jar, user).await
}

pub async fn logout(
    State(state): State<AuthState>,
    auth_user: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    state.session_repo.delete(&auth_user.token).await?;
    Ok((jar.remove(remove_session_cookie()), StatusCode::NO_CONTENT))
}

pub async fn me(State(state): State<AuthState>, auth_user: AuthUser) -> Result<Json<User>> {
    let user = state
        .user_repo
        .find_by_id(&auth_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user))
}
