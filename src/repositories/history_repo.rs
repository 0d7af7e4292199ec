use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DbPool;
use crate::draft::ChangeSummary;
use crate::error::{AppError, Result};
use crate::models::{
    CalendarEntry, FromSqliteRow, HistoryEntry, HistoryExercise, HistorySet, HistorySummary,
    Stats, Workout,
};
use crate::records::{workout_volume, RecordSample};
use crate::repositories::{calendar_repo, workout_repo};

pub const HISTORY_PAGE_SIZE: i64 = 10;

/// What was performed in a live workout, ready to be recorded.
#[derive(Debug, Clone)]
pub struct FinishedWorkout {
    /// Template the workout started from.
    pub workout_id: Option<String>,
    pub performed: Workout,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Tree to save back to the template.
    pub template_update: Option<Workout>,
}

#[derive(Debug)]
pub struct FinishOutcome {
    pub history: HistoryEntry,
    pub calendar: CalendarEntry,
    pub template_changes: Option<ChangeSummary>,
}

#[derive(Clone)]
pub struct HistoryRepository {
    pool: DbPool,
}

impl HistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Records a finished workout, completes its calendar day and, when asked,
    /// writes the performed tree back to the template. Everything commits in
    /// one transaction, so a failure leaves nothing recorded.
    pub async fn finish(&self, user_id: &str, finished: FinishedWorkout) -> Result<FinishOutcome> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let FinishedWorkout {
                workout_id,
                performed,
                started_at,
                finished_at,
                template_update,
            } = finished;

            // The template may have been deleted while the workout was running
            let workout_id = match workout_id {
                Some(id) => workout_repo::find_summary(&tx, &id, &user_id)?.map(|s| s.id),
                None => None,
            };

            let history = insert_entry(
                &tx,
                &user_id,
                workout_id.as_deref(),
                &performed,
                started_at,
                finished_at,
            )?;
            let calendar = calendar_repo::mark_completed(
                &tx,
                &user_id,
                workout_id.as_deref(),
                finished_at.date_naive(),
                &history.summary.id,
            )?;

            let template_changes = match (workout_id.as_deref(), template_update) {
                (Some(id), Some(mut template)) => {
                    workout_repo::drop_missing_exercises(&tx, &mut template, &user_id)?;
                    workout_repo::revise_tree(&tx, id, &user_id, template)?
                        .map(|(_, changes)| changes)
                }
                _ => None,
            };

            tx.commit()?;
            Ok(FinishOutcome {
                history,
                calendar,
                template_changes,
            })
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Newest first. `page` starts at 1.
    pub async fn find_page(&self, user_id: &str, page: i64) -> Result<Vec<HistorySummary>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let offset = (page.max(1) - 1) * HISTORY_PAGE_SIZE;
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM workout_history
                 WHERE user_id = ?
                 ORDER BY finished_at DESC
                 LIMIT ? OFFSET ?",
            )?;
            let entries = stmt
                .query_map(
                    rusqlite::params![user_id, HISTORY_PAGE_SIZE, offset],
                    HistorySummary::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn count(&self, user_id: &str) -> Result<i64> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let count = conn.query_row(
                "SELECT COUNT(*) FROM workout_history WHERE user_id = ?",
                [&user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_entry(&self, id: &str, user_id: &str) -> Result<Option<HistoryEntry>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            load_entry(&conn, &id, &user_id)
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
                "DELETE FROM workout_history WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Remembers the id an external platform assigned to an exported entry.
    pub async fn mark_exported(&self, id: &str, external_id: &str) -> Result<()> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let external_id = external_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute(
                "UPDATE workout_history SET external_id = ?, exported_at = ? WHERE id = ?",
                rusqlite::params![external_id, Utc::now(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Every recorded set of the user, optionally for one catalog exercise,
    /// leaving out the entry `exclude_history_id`.
    pub async fn record_samples(
        &self,
        user_id: &str,
        exercise_id: Option<&str>,
        exclude_history_id: Option<&str>,
    ) -> Result<Vec<RecordSample>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let exercise_id = exercise_id.map(|s| s.to_string());
        let exclude = exclude_history_id.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT he.exercise_id, he.exercise_name, h.id AS history_id, h.finished_at,
                        hs.weight, hs.reps, hs.is_warmup
                 FROM history_sets hs
                 JOIN history_exercises he ON hs.history_exercise_id = he.id
                 JOIN workout_history h ON he.history_id = h.id
                 WHERE h.user_id = ?1
                   AND he.exercise_id IS NOT NULL
                   AND (?2 IS NULL OR he.exercise_id = ?2)
                   AND (?3 IS NULL OR h.id != ?3)
                 ORDER BY h.finished_at, he.position, hs.position",
            )?;
            let samples = stmt
                .query_map(rusqlite::params![user_id, exercise_id, exclude], |row| {
                    Ok(RecordSample {
                        exercise_id: row.get("exercise_id")?,
                        exercise_name: row.get("exercise_name")?,
                        history_id: row.get("history_id")?,
                        achieved_at: row.get("finished_at")?,
                        weight: row.get("weight")?,
                        reps: row.get("reps")?,
                        is_warmup: row.get("is_warmup")?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(samples)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Activity counters relative to the given period starts.
    pub async fn stats(
        &self,
        user_id: &str,
        week_start: DateTime<Utc>,
        month_start: DateTime<Utc>,
    ) -> Result<Stats> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let (workouts_this_week, volume_this_week): (i64, f64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(total_volume), 0.0)
                 FROM workout_history WHERE user_id = ? AND finished_at >= ?",
                rusqlite::params![user_id, week_start],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let workouts_this_month: i64 = conn.query_row(
                "SELECT COUNT(*) FROM workout_history WHERE user_id = ? AND finished_at >= ?",
                rusqlite::params![user_id, month_start],
                |row| row.get(0),
            )?;
            let total_workouts: i64 = conn.query_row(
                "SELECT COUNT(*) FROM workout_history WHERE user_id = ?",
                [&user_id],
                |row| row.get(0),
            )?;
            Ok(Stats {
                workouts_this_week,
                workouts_this_month,
                volume_this_week,
                total_workouts,
            })
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

/// Every set in `performed` is stored. Exercises deleted from the catalog
/// keep their name with no catalog link.
fn insert_entry(
    conn: &Connection,
    user_id: &str,
    workout_id: Option<&str>,
    performed: &Workout,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> Result<HistoryEntry> {
    let id = Uuid::new_v4().to_string();
    let duration = (finished_at - started_at).num_seconds().max(0);
    let volume = workout_volume(&performed.exercises);
    conn.execute(
        "INSERT INTO workout_history
            (id, user_id, workout_id, name, notes, started_at, finished_at, duration_seconds, total_volume)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            user_id,
            workout_id,
            performed.name,
            performed.notes,
            started_at,
            finished_at,
            duration,
            volume
        ],
    )?;

    let mut insert_exercise = conn.prepare(
        "INSERT INTO history_exercises (id, history_id, exercise_id, exercise_name, position, superset_group)
         VALUES (?, ?, (SELECT id FROM exercises WHERE id = ?), ?, ?, ?)",
    )?;
    let mut insert_set = conn.prepare(
        "INSERT INTO history_sets
            (id, history_exercise_id, position, reps, weight, is_warmup, is_dropset, rpe, partial_reps, bar_type)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )?;
    for (position, exercise) in performed.exercises.iter().enumerate() {
        let exercise_row_id = Uuid::new_v4().to_string();
        insert_exercise.execute(rusqlite::params![
            exercise_row_id,
            id,
            exercise.exercise_id,
            exercise.exercise_name,
            position as i32,
            exercise.superset_group
        ])?;
        for (set_position, set) in exercise.sets.iter().enumerate() {
            insert_set.execute(rusqlite::params![
                Uuid::new_v4().to_string(),
                exercise_row_id,
                set_position as i32,
                set.reps.unwrap_or(0),
                set.weight.unwrap_or(0.0),
                set.is_warmup,
                set.is_dropset,
                set.rpe,
                set.partial_reps,
                set.bar_type
            ])?;
        }
    }

    load_entry(conn, &id, user_id)?
        .ok_or_else(|| AppError::Internal("Recorded workout vanished".to_string()))
}

fn load_entry(conn: &Connection, id: &str, user_id: &str) -> Result<Option<HistoryEntry>> {
    let summary = conn
        .query_row(
            "SELECT * FROM workout_history WHERE id = ? AND user_id = ?",
            rusqlite::params![id, user_id],
            HistorySummary::from_row,
        )
        .optional()?;
    let Some(summary) = summary else {
        return Ok(None);
    };

    let mut stmt =
        conn.prepare("SELECT * FROM history_exercises WHERE history_id = ? ORDER BY position")?;
    let mut exercises = stmt
        .query_map([id], HistoryExercise::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut set_stmt =
        conn.prepare("SELECT * FROM history_sets WHERE history_exercise_id = ? ORDER BY position")?;
    for exercise in &mut exercises {
        exercise.sets = set_stmt
            .query_map([&exercise.id], HistorySet::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
    }

    Ok(Some(HistoryEntry { summary, exercises }))
}
