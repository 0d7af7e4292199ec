use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CreateMeasurement, Measurement};
use crate::repositories::MeasurementRepository;

#[derive(Clone)]
pub struct MeasurementsState {
    pub measurement_repo: MeasurementRepository,
}

#[derive(Debug, Deserialize)]
pub struct LabelFilter {
    pub label: Option<String>,
}

pub async fn list(
    State(state): State<MeasurementsState>,
    auth_user: AuthUser,
    Query(filter): Query<LabelFilter>,
) -> Result<Json<Vec<Measurement>>> {
    let label = filter.label.as_deref().filter(|l| !l.trim().is_empty());
    let measurements = state
        .measurement_repo
        .find_by_user(&auth_user.id, label)
        .await?;
    Ok(Json(measurements))
}

pub async fn latest(
    State(state): State<MeasurementsState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Measurement>>> {
    Ok(Json(
        state.measurement_repo.latest_per_label(&auth_user.id).await?,
    ))
}

pub async fn create(
    State(state): State<MeasurementsState>,
    auth_user: AuthUser,
    Json(form): Json<CreateMeasurement>,
) -> Result<(StatusCode, Json<Measurement>)> {
    if form.label.trim().is_empty() {
        return Err(AppError::Validation("Label is required".to_string()));
    }
    if !form.value.is_finite() || form.value <= 0.0 {
        return Err(AppError::Validation(
            "Value must be a positive number".to_string(),
        ));
    }

    let measurement = state.measurement_repo.create(&auth_user.id, &form).await?;
    Ok((StatusCode::CREATED, Json(measurement)))
}

pub async fn delete(
    State(state): State<MeasurementsState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if !state.measurement_repo.delete(&id, &auth_user.id).await? {
        return Err(AppError::not_found("Measurement"));
    }
    Ok(StatusCode::NO_CONTENT)
}
