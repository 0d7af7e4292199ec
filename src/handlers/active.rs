use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::draft::{ChangeSummary, WorkoutDraft};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CalendarEntry, ExerciseRef, HistoryEntry, NewRecord, SetPatch};
use crate::records::{compute_records, detect_new_records, RecordSample};
use crate::repositories::{
    ExerciseRepository, FinishOutcome, FinishedWorkout, HistoryRepository, WorkoutRepository,
};
use crate::services::{ActiveWorkout, ActiveWorkoutStore, ActiveWorkoutView};

const DEFAULT_WORKOUT_NAME: &str = "Workout";

#[derive(Clone)]
pub struct ActiveState {
    pub store: ActiveWorkoutStore,
    pub workout_repo: WorkoutRepository,
    pub exercise_repo: ExerciseRepository,
    pub history_repo: HistoryRepository,
}

#[derive(Debug, Deserialize)]
pub struct StartWorkout {
    pub template_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkoutDetails {
    pub name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseChoice {
    pub exercise_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveForm {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Deserialize)]
pub struct RestTimers {
    pub rest_seconds: Option<i32>,
    pub warmup_rest_seconds: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SupersetForm {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FinishForm {
    #[serde(default)]
    pub update_template: bool,
}

/// An active workout after an edit that created something.
#[derive(Serialize)]
pub struct Created {
    pub id: String,
    pub active: ActiveWorkoutView,
}

#[derive(Serialize)]
pub struct Toggled {
    pub completed: bool,
    pub active: ActiveWorkoutView,
}

#[derive(Serialize)]
pub struct FinishResponse {
    pub history: HistoryEntry,
    pub new_records: Vec<NewRecord>,
    pub calendar: CalendarEntry,
    pub template_changes: Option<ChangeSummary>,
}

impl ActiveState {
    async fn exercise_ref(&self, exercise_id: &str, user_id: &str) -> Result<ExerciseRef> {
        let exercise = self
            .exercise_repo
            .find_visible(exercise_id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise"))?;
        Ok(exercise.to_ref())
    }

    /// Applies an edit and returns the workout as it stands afterwards.
    fn edit<F>(&self, user_id: &str, f: F) -> Result<Json<ActiveWorkoutView>>
    where
        F: FnOnce(&mut WorkoutDraft) -> Result<()>,
    {
        let view = self.store.update(user_id, |active| {
            f(&mut active.draft)?;
            Ok(active.view())
        })?;
        Ok(Json(view))
    }

    fn create<F>(&self, user_id: &str, f: F) -> Result<(StatusCode, Json<Created>)>
    where
        F: FnOnce(&mut WorkoutDraft) -> Result<String>,
    {
        let created = self.store.update(user_id, |active| {
            let id = f(&mut active.draft)?;
            Ok(Created {
                id,
                active: active.view(),
            })
        })?;
        Ok((StatusCode::CREATED, Json(created)))
    }
}

pub async fn start(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Json(form): Json<StartWorkout>,
) -> Result<(StatusCode, Json<ActiveWorkoutView>)> {
    if state.store.is_active(&auth_user.id) {
        return Err(AppError::Conflict(
            "A workout is already in progress".to_string(),
        ));
    }

    let draft = match form.template_id.as_deref() {
        Some(template_id) => {
            let template = state
                .workout_repo
                .find_tree(template_id, &auth_user.id)
                .await?
                .ok_or_else(|| AppError::not_found("Workout"))?;
            WorkoutDraft::new(template)
        }
        None => {
            let name = form
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_WORKOUT_NAME);
            WorkoutDraft::blank(name)
        }
    };

    let view = state
        .store
        .start(&auth_user.id, ActiveWorkout::new(draft, form.template_id))?;
    tracing::debug!(user_id = %auth_user.id, "Started workout");
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn show(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
) -> Result<Json<ActiveWorkoutView>> {
    let active = state
        .store
        .get(&auth_user.id)
        .ok_or_else(|| AppError::not_found("Active workout"))?;
    Ok(Json(active.view()))
}

pub async fn discard(State(state): State<ActiveState>, auth_user: AuthUser) -> Result<StatusCode> {
    state
        .store
        .remove(&auth_user.id)
        .ok_or_else(|| AppError::not_found("Active workout"))?;
    tracing::debug!(user_id = %auth_user.id, "Discarded workout");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_details(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Json(form): Json<WorkoutDetails>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| {
        if let Some(name) = form.name.as_deref() {
            draft.rename(name)?;
        }
        if form.notes.is_some() {
            draft.set_notes(form.notes);
        }
        Ok(())
    })
}

// Exercises

pub async fn add_exercise(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Json(form): Json<ExerciseChoice>,
) -> Result<(StatusCode, Json<Created>)> {
    let exercise = state.exercise_ref(&form.exercise_id, &auth_user.id).await?;
    state.create(&auth_user.id, |draft| Ok(draft.add_exercise(&exercise)))
}

pub async fn remove_exercise(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| draft.remove_exercise(&id))
}

pub async fn move_exercise(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Json(form): Json<MoveForm>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| draft.move_exercise(form.from, form.to))
}

pub async fn replace_exercise(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<ExerciseChoice>,
) -> Result<Json<ActiveWorkoutView>> {
    let exercise = state.exercise_ref(&form.exercise_id, &auth_user.id).await?;
    state.edit(&auth_user.id, |draft| draft.replace_exercise(&id, &exercise))
}

pub async fn set_rest_timers(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<RestTimers>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| {
        draft.set_rest_timers(&id, form.rest_seconds, form.warmup_rest_seconds)
    })
}

pub async fn group_superset(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Json(form): Json<SupersetForm>,
) -> Result<(StatusCode, Json<Created>)> {
    state.create(&auth_user.id, |draft| draft.group_superset(&form.ids))
}

pub async fn ungroup_superset(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| draft.ungroup_superset(&id))
}

// Sets

pub async fn add_set(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path(exercise_id): Path<String>,
) -> Result<(StatusCode, Json<Created>)> {
    state.create(&auth_user.id, |draft| draft.add_set(&exercise_id))
}

pub async fn remove_set(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path((exercise_id, set_id)): Path<(String, String)>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| draft.remove_set(&exercise_id, &set_id))
}

pub async fn move_set(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path(exercise_id): Path<String>,
    Json(form): Json<MoveForm>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| {
        draft.move_set(&exercise_id, form.from, form.to)
    })
}

pub async fn update_set(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path((exercise_id, set_id)): Path<(String, String)>,
    Json(patch): Json<SetPatch>,
) -> Result<Json<ActiveWorkoutView>> {
    state.edit(&auth_user.id, |draft| {
        draft.update_set(&exercise_id, &set_id, patch)
    })
}

pub async fn toggle_set(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Path((exercise_id, set_id)): Path<(String, String)>,
) -> Result<Json<Toggled>> {
    let toggled = state.store.update(&auth_user.id, |active| {
        let completed = active.draft.toggle_set_complete(&exercise_id, &set_id)?;
        Ok(Toggled {
            completed,
            active: active.view(),
        })
    })?;
    Ok(Json(toggled))
}

/// Records the completed sets, then clears the active workout.
pub async fn finish(
    State(state): State<ActiveState>,
    auth_user: AuthUser,
    Json(form): Json<FinishForm>,
) -> Result<Json<FinishResponse>> {
    let active = state
        .store
        .get(&auth_user.id)
        .ok_or_else(|| AppError::not_found("Active workout"))?;

    let performed = active.performed();
    if performed.exercises.is_empty() {
        return Err(AppError::BadRequest(
            "Complete at least one set before finishing".to_string(),
        ));
    }

    let prior = compute_records(
        &state
            .history_repo
            .record_samples(&auth_user.id, None, None)
            .await?,
    );

    let template_update = form.update_template.then(|| active.as_template());
    let FinishOutcome {
        history,
        calendar,
        template_changes,
    } = state
        .history_repo
        .finish(
            &auth_user.id,
            FinishedWorkout {
                workout_id: active.template_id.clone(),
                performed,
                started_at: active.started_at,
                finished_at: Utc::now(),
                template_update,
            },
        )
        .await?;

    let new_records = detect_new_records(&prior, &RecordSample::from_entry(&history));

    state.store.remove(&auth_user.id);
    tracing::info!(
        user_id = %auth_user.id,
        history_id = %history.summary.id,
        volume = history.summary.total_volume,
        new_records = new_records.len(),
        "Workout finished"
    );

    Ok(Json(FinishResponse {
        history,
        new_records,
        calendar,
        template_changes,
    }))
}
