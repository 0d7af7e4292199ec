use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Folder, NameForm, ReorderForm, Split};
use crate::repositories::SplitRepository;

#[derive(Clone)]
pub struct SplitsState {
    pub split_repo: SplitRepository,
}

fn required_name(form: &NameForm) -> Result<&str> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(name)
}

async fn find_split(state: &SplitsState, id: &str, user_id: &str) -> Result<Split> {
    state
        .split_repo
        .find_split(id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Split"))
}

async fn find_folder(state: &SplitsState, id: &str, user_id: &str) -> Result<Folder> {
    state
        .split_repo
        .find_folder(id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Folder"))
}

// Splits

pub async fn list(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Split>>> {
    Ok(Json(state.split_repo.find_splits_by_user(&auth_user.id).await?))
}

pub async fn create(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Json(form): Json<NameForm>,
) -> Result<(StatusCode, Json<Split>)> {
    let name = required_name(&form)?;
    let split = state.split_repo.create_split(&auth_user.id, name).await?;
    Ok((StatusCode::CREATED, Json(split)))
}

pub async fn rename(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<NameForm>,
) -> Result<Json<Split>> {
    let name = required_name(&form)?;
    if !state.split_repo.rename_split(&id, &auth_user.id, name).await? {
        return Err(AppError::not_found("Split"));
    }
    Ok(Json(find_split(&state, &id, &auth_user.id).await?))
}

pub async fn delete(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.split_repo.delete_split(&id, &auth_user.id).await? {
        return Err(AppError::not_found("Split"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reorder(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Json(form): Json<ReorderForm>,
) -> Result<Json<Vec<Split>>> {
    state
        .split_repo
        .reorder_splits(&auth_user.id, form.ids)
        .await?;
    Ok(Json(state.split_repo.find_splits_by_user(&auth_user.id).await?))
}

// Folders

pub async fn list_folders(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(split_id): Path<String>,
) -> Result<Json<Vec<Folder>>> {
    find_split(&state, &split_id, &auth_user.id).await?;
    let folders = state
        .split_repo
        .find_folders_by_split(&split_id, &auth_user.id)
        .await?;
    Ok(Json(folders))
}

pub async fn create_folder(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(split_id): Path<String>,
    Json(form): Json<NameForm>,
) -> Result<(StatusCode, Json<Folder>)> {
    let name = required_name(&form)?;
    find_split(&state, &split_id, &auth_user.id).await?;
    let folder = state
        .split_repo
        .create_folder(&auth_user.id, &split_id, name)
        .await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn reorder_folders(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(split_id): Path<String>,
    Json(form): Json<ReorderForm>,
) -> Result<Json<Vec<Folder>>> {
    find_split(&state, &split_id, &auth_user.id).await?;
    state
        .split_repo
        .reorder_folders(&split_id, form.ids)
        .await?;
    let folders = state
        .split_repo
        .find_folders_by_split(&split_id, &auth_user.id)
        .await?;
    Ok(Json(folders))
}

pub async fn rename_folder(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<NameForm>,
) -> Result<Json<Folder>> {
    let name = required_name(&form)?;
    if !state
        .split_repo
        .rename_folder(&id, &auth_user.id, name)
        .await?
    {
        return Err(AppError::not_found("Folder"));
    }
    Ok(Json(find_folder(&state, &id, &auth_user.id).await?))
}

pub async fn delete_folder(
    State(state): State<SplitsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.split_repo.delete_folder(&id, &auth_user.id).await? {
        return Err(AppError::not_found("Folder"));
    }
    Ok(StatusCode::NO_CONTENT)
}
