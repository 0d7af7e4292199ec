use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::IntegrationStatus;
use crate::services::SyncService;

#[derive(Clone)]
pub struct IntegrationsState {
    pub sync: SyncService,
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn status(
    State(state): State<IntegrationsState>,
    auth_user: AuthUser,
) -> Result<Json<IntegrationStatus>> {
    Ok(Json(state.sync.status(&auth_user.id).await?))
}

pub async fn authorize(
    State(state): State<IntegrationsState>,
    auth_user: AuthUser,
) -> Result<Json<AuthorizeResponse>> {
    let url = state.sync.authorize_url(&auth_user.id)?;
    Ok(Json(AuthorizeResponse { url }))
}

pub async fn callback(
    State(state): State<IntegrationsState>,
    auth_user: AuthUser,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<IntegrationStatus>> {
    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!("Authorization denied: {}", error)));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(AppError::BadRequest(
            "Missing authorization code".to_string(),
        ));
    };

    let status = state
        .sync
        .connect(&auth_user.id, &code, &oauth_state)
        .await?;
    Ok(Json(status))
}

pub async fn disconnect(
    State(state): State<IntegrationsState>,
    auth_user: AuthUser,
) -> Result<StatusCode> {
    if !state.sync.disconnect(&auth_user.id).await? {
        return Err(AppError::not_found("Integration"));
    }
    Ok(StatusCode::NO_CONTENT)
}
