pub mod active;
pub mod strava;
pub mod sync;

pub use active::{ActiveWorkout, ActiveWorkoutStore, ActiveWorkoutView};
pub use strava::StravaExporter;
pub use sync::{ActivityExporter, ExportActivity, SyncService, TokenGrant};
