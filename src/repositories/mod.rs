pub mod calendar_repo;
pub mod exercise_repo;
pub mod history_repo;
pub mod integration_repo;
pub mod measurement_repo;
pub mod session_repo;
pub mod split_repo;
pub mod user_repo;
pub mod workout_repo;

pub use calendar_repo::CalendarRepository;
pub use exercise_repo::ExerciseRepository;
pub use history_repo::{FinishOutcome, FinishedWorkout, HistoryRepository};
pub use integration_repo::IntegrationRepository;
pub use measurement_repo::MeasurementRepository;
pub use session_repo::SessionRepository;
pub use split_repo::SplitRepository;
pub use user_repo::UserRepository;
pub use workout_repo::WorkoutRepository;
