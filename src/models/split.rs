use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

/// A workout program such as "Push/Pull/Legs".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Split {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            position: row.get("position")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A group of workout templates inside a split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub split_id: String,
    pub name: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl FromSqliteRow for Folder {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            split_id: row.get("split_id")?,
            name: row.get("name")?,
            position: row.get("position")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NameForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderForm {
    pub ids: Vec<String>,
}
