use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    MaxWeight,
    OneRepMax,
    SetVolume,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::MaxWeight,
        RecordKind::OneRepMax,
        RecordKind::SetVolume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::MaxWeight => "max_weight",
            RecordKind::OneRepMax => "1rm",
            RecordKind::SetVolume => "set_volume",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RecordKind::MaxWeight => "Max Weight",
            RecordKind::OneRepMax => "Estimated 1RM",
            RecordKind::SetVolume => "Best Set Volume",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordValue {
    pub value: f64,
    pub reps: i32,
    pub weight: f64,
    pub achieved_at: DateTime<Utc>,
    pub history_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRecord {
    pub exercise_id: String,
    pub exercise_name: String,
    pub max_weight: Option<RecordValue>,
    pub best_one_rep_max: Option<RecordValue>,
    pub best_set_volume: Option<RecordValue>,
    pub total_volume: f64,
    pub times_performed: i64,
}

impl ExerciseRecord {
    pub fn best(&self, kind: RecordKind) -> Option<&RecordValue> {
        match kind {
            RecordKind::MaxWeight => self.max_weight.as_ref(),
            RecordKind::OneRepMax => self.best_one_rep_max.as_ref(),
            RecordKind::SetVolume => self.best_set_volume.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    pub exercise_id: String,
    pub exercise_name: String,
    pub kind: RecordKind,
    pub value: f64,
    pub previous: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressPoint {
    pub history_id: String,
    pub achieved_at: DateTime<Utc>,
    pub best_one_rep_max: f64,
    pub max_weight: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub workouts_this_week: i64,
    pub workouts_this_month: i64,
    pub volume_this_week: f64,
    pub total_workouts: i64,
}
