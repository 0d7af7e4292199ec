use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{CalendarEntry, CalendarStatus, FromSqliteRow};

const ENTRY_SELECT: &str = "SELECT c.*, w.name AS workout_name
     FROM calendar_entries c
     LEFT JOIN workouts w ON c.workout_id = w.id";

#[derive(Clone)]
pub struct CalendarRepository {
    pool: DbPool,
}

impl CalendarRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Entries between `from` and `to` inclusive. Scheduled entries dated
    /// before `today` are marked missed first.
    pub async fn find_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<CalendarEntry>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let missed = conn.execute(
                "UPDATE calendar_entries SET status = ?
                 WHERE user_id = ? AND status = ? AND date < ?",
                rusqlite::params![
                    CalendarStatus::Missed.as_str(),
                    user_id,
                    CalendarStatus::Scheduled.as_str(),
                    today
                ],
            )?;
            if missed > 0 {
                tracing::debug!(user_id = %user_id, missed, "Marked scheduled workouts as missed");
            }

            let sql = format!(
                "{} WHERE c.user_id = ? AND c.date >= ? AND c.date <= ? ORDER BY c.date, w.name",
                ENTRY_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(rusqlite::params![user_id, from, to], CalendarEntry::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Plans a template on a date. Returns `None` when the template is not the user's.
    pub async fn schedule(
        &self,
        user_id: &str,
        workout_id: &str,
        date: NaiveDate,
    ) -> Result<Option<CalendarEntry>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let workout_id = workout_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let owned: i64 = conn.query_row(
                "SELECT COUNT(*) FROM workouts WHERE id = ? AND user_id = ?",
                rusqlite::params![workout_id, user_id],
                |row| row.get(0),
            )?;
            if owned == 0 {
                return Ok(None);
            }

            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO calendar_entries (id, user_id, workout_id, date, status) VALUES (?, ?, ?, ?, ?)",
                rusqlite::params![
                    id,
                    user_id,
                    workout_id,
                    date,
                    CalendarStatus::Scheduled.as_str()
                ],
            )?;
            find_entry(&conn, &id)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "DELETE FROM calendar_entries WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

/// Marks the day's entry for `workout_id` as completed, adding one if the
/// workout was not planned.
pub(crate) fn mark_completed(
    conn: &Connection,
    user_id: &str,
    workout_id: Option<&str>,
    date: NaiveDate,
    history_id: &str,
) -> Result<CalendarEntry> {
    let planned: Option<String> = match workout_id {
        Some(workout_id) => conn
            .query_row(
                "SELECT id FROM calendar_entries
                 WHERE user_id = ? AND workout_id = ? AND date = ? AND status != ?
                 LIMIT 1",
                rusqlite::params![
                    user_id,
                    workout_id,
                    date,
                    CalendarStatus::Completed.as_str()
                ],
                |row| row.get(0),
            )
            .optional()?,
        None => None,
    };

    let id = match planned {
        Some(id) => {
            conn.execute(
                "UPDATE calendar_entries SET status = ?, history_id = ? WHERE id = ?",
                rusqlite::params![CalendarStatus::Completed.as_str(), history_id, id],
            )?;
            id
        }
        None => {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO calendar_entries (id, user_id, workout_id, history_id, date, status)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    id,
                    user_id,
                    workout_id,
                    history_id,
                    date,
                    CalendarStatus::Completed.as_str()
                ],
            )?;
            id
        }
    };

    find_entry(conn, &id)?
        .ok_or_else(|| AppError::Internal("Calendar entry vanished".to_string()))
}

fn find_entry(conn: &Connection, id: &str) -> Result<Option<CalendarEntry>> {
    let sql = format!("{} WHERE c.id = ?", ENTRY_SELECT);
    let entry = conn
        .query_row(&sql, [id], CalendarEntry::from_row)
        .optional()?;
    Ok(entry)
}
