use chrono::NaiveDate;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarStatus {
    #[default]
    Scheduled,
    Completed,
    Missed,
}

impl CalendarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarStatus::Scheduled => "scheduled",
            CalendarStatus::Completed => "completed",
            CalendarStatus::Missed => "missed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => CalendarStatus::Completed,
            "missed" => CalendarStatus::Missed,
            _ => CalendarStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEntry {
    pub id: String,
    pub user_id: String,
    pub workout_id: Option<String>,
    pub workout_name: Option<String>,
    pub history_id: Option<String>,
    pub date: NaiveDate,
    pub status: CalendarStatus,
}

impl FromSqliteRow for CalendarEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get("status")?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            workout_id: row.get("workout_id")?,
            workout_name: row.get("workout_name")?,
            history_id: row.get("history_id")?,
            date: row.get("date")?,
            status: CalendarStatus::parse(&status),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleWorkout {
    pub date: NaiveDate,
    pub workout_id: String,
}
