use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::draft::{validate_workout, ChangeSummary};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CreateWorkout, MoveWorkout, Workout, WorkoutSummary};
use crate::repositories::{SplitRepository, WorkoutRepository};

#[derive(Clone)]
pub struct WorkoutsState {
    pub workout_repo: WorkoutRepository,
    pub split_repo: SplitRepository,
}

#[derive(Debug, Deserialize)]
pub struct WorkoutFilter {
    pub folder_id: Option<String>,
}

#[derive(Serialize)]
pub struct SaveResponse {
    pub workout: Workout,
    pub changes: ChangeSummary,
}

/// Rejects folders that do not belong to the user.
async fn check_folder(state: &WorkoutsState, folder_id: Option<&str>, user_id: &str) -> Result<()> {
    if let Some(folder_id) = folder_id {
        state
            .split_repo
            .find_folder(folder_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder"))?;
    }
    Ok(())
}

pub async fn list(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Query(filter): Query<WorkoutFilter>,
) -> Result<Json<Vec<WorkoutSummary>>> {
    let workouts = state
        .workout_repo
        .find_by_user(&auth_user.id, filter.folder_id.as_deref())
        .await?;
    Ok(Json(workouts))
}

pub async fn create(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Json(form): Json<CreateWorkout>,
) -> Result<(StatusCode, Json<WorkoutSummary>)> {
    if form.name.trim().is_empty() {
        return Err(AppError::Validation("Workout name is required".to_string()));
    }
    check_folder(&state, form.folder_id.as_deref(), &auth_user.id).await?;

    let notes = form.notes.as_deref().filter(|n| !n.trim().is_empty());
    let workout = state
        .workout_repo
        .create(&auth_user.id, &form.name, notes, form.folder_id.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(workout)))
}

pub async fn show(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Workout>> {
    let workout = state
        .workout_repo
        .find_tree(&id, &auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout"))?;
    Ok(Json(workout))
}

/// Saves an edited tree, writing only what changed.
pub async fn save(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(workout): Json<Workout>,
) -> Result<Json<SaveResponse>> {
    validate_workout(&workout)?;

    let (workout, changes) = state
        .workout_repo
        .save_revision(&id, &auth_user.id, workout)
        .await?
        .ok_or_else(|| AppError::not_found("Workout"))?;
    Ok(Json(SaveResponse { workout, changes }))
}

pub async fn delete(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.workout_repo.delete(&id, &auth_user.id).await? {
        return Err(AppError::not_found("Workout"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn duplicate(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Workout>)> {
    let copy = state
        .workout_repo
        .duplicate(&id, &auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout"))?;
    Ok((StatusCode::CREATED, Json(copy)))
}

pub async fn move_to_folder(
    State(state): State<WorkoutsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<MoveWorkout>,
) -> Result<Json<WorkoutSummary>> {
    check_folder(&state, form.folder_id.as_deref(), &auth_user.id).await?;

    if !state
        .workout_repo
        .move_to_folder(&id, &auth_user.id, form.folder_id.as_deref())
        .await?
    {
        return Err(AppError::not_found("Workout"));
    }
    let workout = state
        .workout_repo
        .find_summary(&id, &auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout"))?;
    Ok(Json(workout))
}
