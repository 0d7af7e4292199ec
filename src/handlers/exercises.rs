use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::exercise::is_known_muscle_group;
use crate::models::{CreateExercise, Exercise, UpdateExercise};
use crate::repositories::ExerciseRepository;

#[derive(Clone)]
pub struct ExercisesState {
    pub exercise_repo: ExerciseRepository,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseFilter {
    pub muscle_group: Option<String>,
}

fn validate(form: &CreateExercise) -> Result<()> {
    if form.name.trim().is_empty() {
        return Err(AppError::Validation("Exercise name is required".to_string()));
    }
    if !is_known_muscle_group(&form.muscle_group) {
        return Err(AppError::Validation(format!(
            "Unknown muscle group: {}",
            form.muscle_group
        )));
    }
    Ok(())
}

/// Loads an exercise the user is allowed to modify.
async fn find_own(state: &ExercisesState, id: &str, user_id: &str) -> Result<Exercise> {
    let exercise = state
        .exercise_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise"))?;

    if !exercise.is_owned_by(user_id) {
        return Err(AppError::Forbidden(
            "You can only modify your own exercises".to_string(),
        ));
    }
    Ok(exercise)
}

pub async fn list(
    State(state): State<ExercisesState>,
    auth_user: AuthUser,
    Query(filter): Query<ExerciseFilter>,
) -> Result<Json<Vec<Exercise>>> {
    let muscle_group = filter.muscle_group.as_deref().filter(|g| !g.is_empty());
    let exercises = state
        .exercise_repo
        .find_available_for_user(&auth_user.id, muscle_group)
        .await?;
    Ok(Json(exercises))
}

pub async fn get(
    State(state): State<ExercisesState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Exercise>> {
    let exercise = state
        .exercise_repo
        .find_visible(&id, &auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise"))?;
    Ok(Json(exercise))
}

pub async fn create(
    State(state): State<ExercisesState>,
    auth_user: AuthUser,
    Json(form): Json<CreateExercise>,
) -> Result<(StatusCode, Json<Exercise>)> {
    validate(&form)?;
    let exercise = state.exercise_repo.create(&auth_user.id, &form).await?;
    Ok((StatusCode::CREATED, Json(exercise)))
}

pub async fn update(
    State(state): State<ExercisesState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<UpdateExercise>,
) -> Result<Json<Exercise>> {
    find_own(&state, &id, &auth_user.id).await?;
    validate(&form)?;

    state
        .exercise_repo
        .update(&id, &auth_user.id, &form)
        .await?;

    let exercise = state
        .exercise_repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise"))?;
    Ok(Json(exercise))
}

pub async fn delete(
    State(state): State<ExercisesState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    find_own(&state, &id, &auth_user.id).await?;
    state.exercise_repo.delete(&id, &auth_user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
