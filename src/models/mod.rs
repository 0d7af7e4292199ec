pub mod calendar;
pub mod exercise;
pub mod from_row;
pub mod history;
pub mod integration;
pub mod measurement;
pub mod record;
pub mod split;
pub mod user;
pub mod workout;

pub use calendar::{CalendarEntry, CalendarStatus, ScheduleWorkout};
pub use exercise::{CreateExercise, Exercise, ExerciseRef, UpdateExercise};
pub use from_row::FromSqliteRow;
pub use history::{HistoryEntry, HistoryExercise, HistorySet, HistorySummary};
pub use integration::{Integration, IntegrationStatus};
pub use measurement::{CreateMeasurement, Measurement};
pub use record::{ExerciseRecord, NewRecord, ProgressPoint, RecordKind, RecordValue, Stats};
pub use split::{Folder, NameForm, ReorderForm, Split};
pub use user::{CreateUser, LoginCredentials, User};
pub use workout::{
    CreateWorkout, ExerciseSet, MoveWorkout, SetPatch, Workout, WorkoutExercise, WorkoutSummary,
};
