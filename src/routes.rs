use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Extension, Router,
};

use crate::db::DbPool;
use crate::handlers::{
    active, auth, calendar, exercises, health, history, integrations, measurements, splits, stats,
    workouts,
};
use crate::middleware::AuthContext;
use crate::repositories::{
    CalendarRepository, ExerciseRepository, HistoryRepository, IntegrationRepository,
    MeasurementRepository, SessionRepository, SplitRepository, UserRepository, WorkoutRepository,
};
use crate::services::{ActiveWorkoutStore, ActivityExporter, SyncService};

/// Handler states for every area of the API.
#[derive(Clone)]
pub struct AppStates {
    pub auth_context: AuthContext,
    pub auth: auth::AuthState,
    pub exercises: exercises::ExercisesState,
    pub splits: splits::SplitsState,
    pub workouts: workouts::WorkoutsState,
    pub active: active::ActiveState,
    pub history: history::HistoryState,
    pub stats: stats::StatsState,
    pub measurements: measurements::MeasurementsState,
    pub calendar: calendar::CalendarState,
    pub integrations: integrations::IntegrationsState,
}

impl AppStates {
    pub fn new(
        pool: DbPool,
        session_ttl_days: i64,
        exporter: Option<Arc<dyn ActivityExporter>>,
    ) -> Self {
        let user_repo = UserRepository::new(pool.clone());
        let session_repo = SessionRepository::with_ttl_days(pool.clone(), session_ttl_days);
        let exercise_repo = ExerciseRepository::new(pool.clone());
        let split_repo = SplitRepository::new(pool.clone());
        let workout_repo = WorkoutRepository::new(pool.clone());
        let history_repo = HistoryRepository::new(pool.clone());
        let measurement_repo = MeasurementRepository::new(pool.clone());
        let calendar_repo = CalendarRepository::new(pool.clone());
        let integration_repo = IntegrationRepository::new(pool);

        let sync = SyncService::new(exporter, integration_repo, history_repo.clone());

        Self {
            auth_context: AuthContext {
                sessions: session_repo.clone(),
                users: user_repo.clone(),
            },
            auth: auth::AuthState {
                user_repo,
                session_repo,
            },
            exercises: exercises::ExercisesState {
                exercise_repo: exercise_repo.clone(),
            },
            splits: splits::SplitsState {
                split_repo: split_repo.clone(),
            },
            workouts: workouts::WorkoutsState {
                workout_repo: workout_repo.clone(),
                split_repo,
            },
            active: active::ActiveState {
                store: ActiveWorkoutStore::new(),
                workout_repo,
                exercise_repo: exercise_repo.clone(),
                history_repo: history_repo.clone(),
            },
            history: history::HistoryState {
                history_repo: history_repo.clone(),
                sync: sync.clone(),
            },
            stats: stats::StatsState {
                history_repo,
                exercise_repo,
            },
            measurements: measurements::MeasurementsState { measurement_repo },
            calendar: calendar::CalendarState { calendar_repo },
            integrations: integrations::IntegrationsState { sync },
        }
    }
}

pub fn create_router(states: AppStates) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .with_state(states.auth)
        // Exercise catalog
        .route("/exercises", get(exercises::list).post(exercises::create))
        .route(
            "/exercises/{id}",
            get(exercises::get)
                .put(exercises::update)
                .delete(exercises::delete),
        )
        .with_state(states.exercises)
        // Splits and folders
        .route("/splits", get(splits::list).post(splits::create))
        .route("/splits/reorder", post(splits::reorder))
        .route("/splits/{id}", put(splits::rename).delete(splits::delete))
        .route(
            "/splits/{id}/folders",
            get(splits::list_folders).post(splits::create_folder),
        )
        .route("/splits/{id}/folders/reorder", post(splits::reorder_folders))
        .route(
            "/folders/{id}",
            put(splits::rename_folder).delete(splits::delete_folder),
        )
        .with_state(states.splits)
        // Workout templates
        .route("/workouts", get(workouts::list).post(workouts::create))
        .route(
            "/workouts/{id}",
            get(workouts::show)
                .put(workouts::save)
                .delete(workouts::delete),
        )
        .route("/workouts/{id}/duplicate", post(workouts::duplicate))
        .route("/workouts/{id}/folder", put(workouts::move_to_folder))
        .with_state(states.workouts)
        // Live workout
        .route(
            "/active",
            get(active::show)
                .post(active::start)
                .patch(active::update_details)
                .delete(active::discard),
        )
        .route("/active/finish", post(active::finish))
        .route("/active/exercises", post(active::add_exercise))
        .route("/active/exercises/move", post(active::move_exercise))
        .route("/active/exercises/{id}", delete(active::remove_exercise))
        .route("/active/exercises/{id}/replace", put(active::replace_exercise))
        .route("/active/exercises/{id}/rest", put(active::set_rest_timers))
        .route("/active/exercises/{id}/sets", post(active::add_set))
        .route("/active/exercises/{id}/sets/move", post(active::move_set))
        .route(
            "/active/exercises/{id}/sets/{set_id}",
            delete(active::remove_set).patch(active::update_set),
        )
        .route(
            "/active/exercises/{id}/sets/{set_id}/toggle",
            post(active::toggle_set),
        )
        .route("/active/supersets", post(active::group_superset))
        .route("/active/supersets/{id}", delete(active::ungroup_superset))
        .with_state(states.active)
        // History
        .route("/history", get(history::list))
        .route("/history/{id}", get(history::show).delete(history::delete))
        .route("/history/{id}/export", post(history::export))
        .with_state(states.history)
        // Records and stats
        .route("/stats", get(stats::index))
        .route("/records", get(stats::records))
        .route("/records/{exercise_id}", get(stats::exercise_stats))
        .with_state(states.stats)
        // Measurements
        .route(
            "/measurements",
            get(measurements::list).post(measurements::create),
        )
        .route("/measurements/latest", get(measurements::latest))
        .route("/measurements/{id}", delete(measurements::delete))
        .with_state(states.measurements)
        // Calendar
        .route("/calendar", get(calendar::list).post(calendar::schedule))
        .route("/calendar/{id}", delete(calendar::delete))
        .with_state(states.calendar)
        // Third-party sync
        .route(
            "/integrations/strava",
            get(integrations::status).delete(integrations::disconnect),
        )
        .route("/integrations/strava/authorize", get(integrations::authorize))
        .route("/integrations/strava/callback", get(integrations::callback))
        .with_state(states.integrations)
        .layer(Extension(states.auth_context))
}
