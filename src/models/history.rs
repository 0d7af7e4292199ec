use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use super::FromSqliteRow;

/// A finished workout as recorded in the user's history.
#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub id: String,
    pub user_id: String,
    pub workout_id: Option<String>,
    pub name: String,
    pub notes: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub total_volume: f64,
    pub external_id: Option<String>,
    pub exported_at: Option<DateTime<Utc>>,
}

impl FromSqliteRow for HistorySummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            workout_id: row.get("workout_id")?,
            name: row.get("name")?,
            notes: row.get("notes")?,
            started_at: row.get("started_at")?,
            finished_at: row.get("finished_at")?,
            duration_seconds: row.get("duration_seconds")?,
            total_volume: row.get("total_volume")?,
            external_id: row.get("external_id")?,
            exported_at: row.get("exported_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub summary: HistorySummary,
    pub exercises: Vec<HistoryExercise>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryExercise {
    pub id: String,
    pub exercise_id: Option<String>,
    pub exercise_name: String,
    pub position: i32,
    pub superset_group: Option<String>,
    pub sets: Vec<HistorySet>,
}

impl FromSqliteRow for HistoryExercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            exercise_id: row.get("exercise_id")?,
            exercise_name: row.get("exercise_name")?,
            position: row.get("position")?,
            superset_group: row.get("superset_group")?,
            sets: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistorySet {
    pub id: String,
    pub position: i32,
    pub reps: i32,
    pub weight: f64,
    pub is_warmup: bool,
    pub is_dropset: bool,
    pub rpe: Option<f64>,
    pub partial_reps: Option<i32>,
    pub bar_type: Option<String>,
}

impl FromSqliteRow for HistorySet {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            position: row.get("position")?,
            reps: row.get("reps")?,
            weight: row.get("weight")?,
            is_warmup: row.get("is_warmup")?,
            is_dropset: row.get("is_dropset")?,
            rpe: row.get("rpe")?,
            partial_reps: row.get("partial_reps")?,
            bar_type: row.get("bar_type")?,
        })
    }
}
