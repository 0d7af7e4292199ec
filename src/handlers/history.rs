use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{HistoryEntry, HistorySummary};
use crate::repositories::history_repo::HISTORY_PAGE_SIZE;
use crate::repositories::HistoryRepository;
use crate::services::SyncService;

#[derive(Clone)]
pub struct HistoryState {
    pub history_repo: HistoryRepository,
    pub sync: SyncService,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Serialize)]
pub struct HistoryPage {
    pub entries: Vec<HistorySummary>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

pub async fn list(
    State(state): State<HistoryState>,
    auth_user: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<HistoryPage>> {
    let page = query.page.unwrap_or(1).max(1);
    let total = state.history_repo.count(&auth_user.id).await?;
    let entries = state.history_repo.find_page(&auth_user.id, page).await?;

    Ok(Json(HistoryPage {
        entries,
        page,
        total_pages: (total + HISTORY_PAGE_SIZE - 1) / HISTORY_PAGE_SIZE,
        total,
    }))
}

pub async fn show(
    State(state): State<HistoryState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<HistoryEntry>> {
    let entry = state
        .history_repo
        .find_entry(&id, &auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout history"))?;
    Ok(Json(entry))
}

pub async fn delete(
    State(state): State<HistoryState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.history_repo.delete(&id, &auth_user.id).await? {
        return Err(AppError::not_found("Workout history"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export(
    State(state): State<HistoryState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<HistorySummary>> {
    Ok(Json(state.sync.export(&auth_user.id, &id).await?))
}
