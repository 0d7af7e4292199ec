use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CalendarEntry, ScheduleWorkout};
use crate::repositories::CalendarRepository;

#[derive(Clone)]
pub struct CalendarState {
    pub calendar_repo: CalendarRepository,
}

#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn list(
    State(state): State<CalendarState>,
    auth_user: AuthUser,
    Query(range): Query<DateRange>,
) -> Result<Json<Vec<CalendarEntry>>> {
    if range.to < range.from {
        return Err(AppError::BadRequest(
            "Range end is before its start".to_string(),
        ));
    }
    let entries = state
        .calendar_repo
        .find_range(&auth_user.id, range.from, range.to, Utc::now().date_naive())
        .await?;
    Ok(Json(entries))
}

pub async fn schedule(
    State(state): State<CalendarState>,
    auth_user: AuthUser,
    Json(form): Json<ScheduleWorkout>,
) -> Result<(StatusCode, Json<CalendarEntry>)> {
    let entry = state
        .calendar_repo
        .schedule(&auth_user.id, &form.workout_id, form.date)
        .await?
        .ok_or_else(|| AppError::not_found("Workout"))?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete(
    State(state): State<CalendarState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.calendar_repo.delete(&id, &auth_user.id).await? {
        return Err(AppError::not_found("Calendar entry"));
    }
    Ok(StatusCode::NO_CONTENT)
}
