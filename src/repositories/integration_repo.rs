use rusqlite::OptionalExtension;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{FromSqliteRow, Integration};

/// OAuth credentials per user and provider.
#[derive(Clone)]
pub struct IntegrationRepository {
    pool: DbPool,
}

impl IntegrationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: &str, provider: &str) -> Result<Option<Integration>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let provider = provider.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt =
                conn.prepare("SELECT * FROM integrations WHERE user_id = ? AND provider = ?")?;
            let result = stmt
                .query_row(rusqlite::params![user_id, provider], Integration::from_row)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Stores fresh tokens, keeping the original connection time on refresh.
    pub async fn upsert(&self, integration: &Integration) -> Result<()> {
        let pool = self.pool.clone();
        let row = integration.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO integrations
                    (user_id, provider, access_token, refresh_token, expires_at, athlete_id, connected_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(user_id, provider) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    expires_at = excluded.expires_at,
                    athlete_id = COALESCE(excluded.athlete_id, integrations.athlete_id)",
                rusqlite::params![
                    row.user_id,
                    row.provider,
                    row.access_token,
                    row.refresh_token,
                    row.expires_at,
                    row.athlete_id,
                    row.connected_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn delete(&self, user_id: &str, provider: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let provider = provider.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "DELETE FROM integrations WHERE user_id = ? AND provider = ?",
                rusqlite::params![user_id, provider],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}
