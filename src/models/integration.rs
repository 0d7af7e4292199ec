use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use super::FromSqliteRow;

pub const STRAVA_PROVIDER: &str = "strava";

/// Stored OAuth credentials for a third-party fitness platform.
#[derive(Debug, Clone)]
pub struct Integration {
    pub user_id: String,
    pub provider: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub athlete_id: Option<String>,
    pub connected_at: DateTime<Utc>,
}

impl Integration {
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at <= now + margin
    }
}

impl FromSqliteRow for Integration {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            provider: row.get("provider")?,
            access_token: row.get("access_token")?,
            refresh_token: row.get("refresh_token")?,
            expires_at: row.get("expires_at")?,
            athlete_id: row.get("athlete_id")?,
            connected_at: row.get("connected_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStatus {
    pub provider: &'static str,
    pub configured: bool,
    pub connected: bool,
    pub athlete_id: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
}
