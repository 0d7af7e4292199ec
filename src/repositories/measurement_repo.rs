use chrono::Utc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{CreateMeasurement, FromSqliteRow, Measurement};

#[derive(Clone)]
pub struct MeasurementRepository {
    pool: DbPool,
}

impl MeasurementRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Newest first, optionally for one label.
    pub async fn find_by_user(&self, user_id: &str, label: Option<&str>) -> Result<Vec<Measurement>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let label = label.map(|s| s.trim().to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM measurements
                 WHERE user_id = ?1 AND (?2 IS NULL OR label = ?2)
                 ORDER BY measured_at DESC",
            )?;
            let measurements = stmt
                .query_map(rusqlite::params![user_id, label], Measurement::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(measurements)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// The most recent value of every label, ordered by label.
    pub async fn latest_per_label(&self, user_id: &str) -> Result<Vec<Measurement>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT m.* FROM measurements m
                 WHERE m.user_id = ?1
                   AND m.id = (
                       SELECT id FROM measurements
                       WHERE user_id = ?1 AND label = m.label
                       ORDER BY measured_at DESC, id
                       LIMIT 1
                   )
                 ORDER BY m.label",
            )?;
            let measurements = stmt
                .query_map([&user_id], Measurement::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(measurements)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn create(&self, user_id: &str, form: &CreateMeasurement) -> Result<Measurement> {
        let measurement = Measurement {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            label: form.label.trim().to_string(),
            value: form.value,
            unit: form.unit.trim().to_string(),
            measured_at: form.measured_at.unwrap_or_else(Utc::now),
        };
        let row = measurement.clone();

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO measurements (id, user_id, label, value, unit, measured_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    row.id,
                    row.user_id,
                    row.label,
                    row.value,
                    row.unit,
                    row.measured_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(measurement)
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "DELETE FROM measurements WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
