use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: String,
    pub user_id: String,
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub measured_at: DateTime<Utc>,
}

impl FromSqliteRow for Measurement {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            label: row.get("label")?,
            value: row.get("value")?,
            unit: row.get("unit")?,
            measured_at: row.get("measured_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMeasurement {
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub measured_at: Option<DateTime<Utc>>,
}
