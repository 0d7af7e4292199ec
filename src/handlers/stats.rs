use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Exercise, ExerciseRecord, ProgressPoint, Stats};
use crate::records::{compute_records, exercise_progress};
use crate::repositories::{ExerciseRepository, HistoryRepository};

#[derive(Clone)]
pub struct StatsState {
    pub history_repo: HistoryRepository,
    pub exercise_repo: ExerciseRepository,
}

#[derive(Serialize)]
pub struct ExerciseStats {
    pub exercise: Exercise,
    pub record: Option<ExerciseRecord>,
    pub progress: Vec<ProgressPoint>,
}

pub async fn index(State(state): State<StatsState>, auth_user: AuthUser) -> Result<Json<Stats>> {
    let now = Utc::now();
    let stats = state
        .history_repo
        .stats(&auth_user.id, now - Duration::days(7), now - Duration::days(30))
        .await?;
    Ok(Json(stats))
}

pub async fn records(
    State(state): State<StatsState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<ExerciseRecord>>> {
    let samples = state
        .history_repo
        .record_samples(&auth_user.id, None, None)
        .await?;
    Ok(Json(compute_records(&samples)))
}

pub async fn exercise_stats(
    State(state): State<StatsState>,
    auth_user: AuthUser,
    Path(exercise_id): Path<String>,
) -> Result<Json<ExerciseStats>> {
    let exercise = state
        .exercise_repo
        .find_visible(&exercise_id, &auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Exercise"))?;

    let samples = state
        .history_repo
        .record_samples(&auth_user.id, Some(&exercise_id), None)
        .await?;

    Ok(Json(ExerciseStats {
        exercise,
        record: compute_records(&samples).into_iter().next(),
        progress: exercise_progress(&samples),
    }))
}
