use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

/// A workout template with its full exercise and set tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    #[serde(default)]
    pub id: String,
    pub exercise_id: String,
    /// Display only; resolved from the catalog when loading.
    #[serde(default)]
    pub exercise_name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub rest_seconds: Option<i32>,
    #[serde(default)]
    pub warmup_rest_seconds: Option<i32>,
    #[serde(default)]
    pub superset_group: Option<String>,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

impl WorkoutExercise {
    /// Compares the columns persisted for this row, ignoring sets and display fields.
    pub fn same_row(&self, other: &WorkoutExercise) -> bool {
        self.id == other.id
            && self.exercise_id == other.exercise_id
            && self.position == other.position
            && self.rest_seconds == other.rest_seconds
            && self.warmup_rest_seconds == other.warmup_rest_seconds
            && self.superset_group == other.superset_group
    }

    pub fn without_sets(&self) -> WorkoutExercise {
        WorkoutExercise {
            sets: Vec::new(),
            ..self.clone()
        }
    }
}

impl FromSqliteRow for WorkoutExercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            exercise_id: row.get("exercise_id")?,
            exercise_name: row.get("exercise_name")?,
            position: row.get("position")?,
            rest_seconds: row.get("rest_seconds")?,
            warmup_rest_seconds: row.get("warmup_rest_seconds")?,
            superset_group: row.get("superset_group")?,
            sets: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub reps: Option<i32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_warmup: bool,
    #[serde(default)]
    pub is_dropset: bool,
    #[serde(default)]
    pub rpe: Option<f64>,
    #[serde(default)]
    pub partial_reps: Option<i32>,
    #[serde(default)]
    pub bar_type: Option<String>,
}

impl FromSqliteRow for ExerciseSet {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            position: row.get("position")?,
            reps: row.get("reps")?,
            weight: row.get("weight")?,
            completed: row.get("completed")?,
            is_warmup: row.get("is_warmup")?,
            is_dropset: row.get("is_dropset")?,
            rpe: row.get("rpe")?,
            partial_reps: row.get("partial_reps")?,
            bar_type: row.get("bar_type")?,
        })
    }
}

/// Partial update of a set; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetPatch {
    pub reps: Option<i32>,
    pub weight: Option<f64>,
    pub rpe: Option<f64>,
    pub partial_reps: Option<i32>,
    pub bar_type: Option<String>,
    pub is_warmup: Option<bool>,
    pub is_dropset: Option<bool>,
    pub completed: Option<bool>,
}

/// A template row without its tree, as listed in folders.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutSummary {
    pub id: String,
    pub user_id: String,
    pub folder_id: Option<String>,
    pub name: String,
    pub notes: Option<String>,
    pub exercise_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromSqliteRow for WorkoutSummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            folder_id: row.get("folder_id")?,
            name: row.get("name")?,
            notes: row.get("notes")?,
            exercise_count: row.get("exercise_count")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkout {
    pub name: String,
    pub notes: Option<String>,
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MoveWorkout {
    pub folder_id: Option<String>,
}
