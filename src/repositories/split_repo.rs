use std::collections::HashSet;

use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{Folder, FromSqliteRow, Split};

/// Splits and the folders inside them.
#[derive(Clone)]
pub struct SplitRepository {
    pool: DbPool,
}

impl SplitRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // Splits
    pub async fn find_splits_by_user(&self, user_id: &str) -> Result<Vec<Split>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt =
                conn.prepare("SELECT * FROM splits WHERE user_id = ? ORDER BY position, created_at")?;
            let splits = stmt
                .query_map([&user_id], Split::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(splits)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_split(&self, id: &str, user_id: &str) -> Result<Option<Split>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM splits WHERE id = ? AND user_id = ?")?;
            let result = stmt
                .query_row(rusqlite::params![id, user_id], Split::from_row)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Appends a split after the user's existing ones.
    pub async fn create_split(&self, user_id: &str, name: &str) -> Result<Split> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let name = name.trim().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let position: i32 = conn.query_row(
                "SELECT COUNT(*) FROM splits WHERE user_id = ?",
                [&user_id],
                |row| row.get(0),
            )?;
            let split = Split {
                id: Uuid::new_v4().to_string(),
                user_id,
                name,
                position,
                created_at: Utc::now(),
            };
            conn.execute(
                "INSERT INTO splits (id, user_id, name, position, created_at) VALUES (?, ?, ?, ?, ?)",
                rusqlite::params![
                    split.id,
                    split.user_id,
                    split.name,
                    split.position,
                    split.created_at
                ],
            )?;
            Ok(split)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn rename_split(&self, id: &str, user_id: &str, name: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        let name = name.trim().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE splits SET name = ? WHERE id = ? AND user_id = ?",
                rusqlite::params![name, id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Deletes the split and its folders; workouts in those folders are kept.
    pub async fn delete_split(&self, id: &str, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "DELETE FROM splits WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            if rows > 0 {
                renumber(&conn, "splits", "user_id", &user_id)?;
            }
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn reorder_splits(&self, user_id: &str, ids: Vec<String>) -> Result<()> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            apply_order(&tx, "splits", "user_id", &user_id, &ids)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    // Folders
    pub async fn find_folders_by_split(&self, split_id: &str, user_id: &str) -> Result<Vec<Folder>> {
        let pool = self.pool.clone();
        let split_id = split_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM folders WHERE split_id = ? AND user_id = ? ORDER BY position, created_at",
            )?;
            let folders = stmt
                .query_map(rusqlite::params![split_id, user_id], Folder::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(folders)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_folder(&self, id: &str, user_id: &str) -> Result<Option<Folder>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM folders WHERE id = ? AND user_id = ?")?;
            let result = stmt
                .query_row(rusqlite::params![id, user_id], Folder::from_row)
                .optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn create_folder(&self, user_id: &str, split_id: &str, name: &str) -> Result<Folder> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let split_id = split_id.to_string();
        let name = name.trim().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let position: i32 = conn.query_row(
                "SELECT COUNT(*) FROM folders WHERE split_id = ?",
                [&split_id],
                |row| row.get(0),
            )?;
            let folder = Folder {
                id: Uuid::new_v4().to_string(),
                user_id,
                split_id,
                name,
                position,
                created_at: Utc::now(),
            };
            conn.execute(
                "INSERT INTO folders (id, user_id, split_id, name, position, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    folder.id,
                    folder.user_id,
                    folder.split_id,
                    folder.name,
                    folder.position,
                    folder.created_at
                ],
            )?;
            Ok(folder)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn rename_folder(&self, id: &str, user_id: &str, name: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        let name = name.trim().to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE folders SET name = ? WHERE id = ? AND user_id = ?",
                rusqlite::params![name, id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Deletes the folder; its workouts become unfiled.
    pub async fn delete_folder(&self, id: &str, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let split_id: Option<String> = conn
                .query_row(
                    "SELECT split_id FROM folders WHERE id = ? AND user_id = ?",
                    rusqlite::params![id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(split_id) = split_id else {
                return Ok(false);
            };
            conn.execute("DELETE FROM folders WHERE id = ?", [&id])?;
            renumber(&conn, "folders", "split_id", &split_id)?;
            Ok(true)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn reorder_folders(&self, split_id: &str, ids: Vec<String>) -> Result<()> {
        let pool = self.pool.clone();
        let split_id = split_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            apply_order(&tx, "folders", "split_id", &split_id, &ids)?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

// `table` and `scope` are always one of the literals above, never user input.
fn scoped_ids(conn: &rusqlite::Connection, table: &str, scope: &str, value: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ? ORDER BY position, created_at",
        table, scope
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([value], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

fn write_positions(conn: &rusqlite::Connection, table: &str, ids: &[String]) -> Result<()> {
    let sql = format!("UPDATE {} SET position = ? WHERE id = ?", table);
    let mut stmt = conn.prepare(&sql)?;
    for (position, id) in ids.iter().enumerate() {
        stmt.execute(rusqlite::params![position as i32, id])?;
    }
    Ok(())
}

fn renumber(conn: &rusqlite::Connection, table: &str, scope: &str, value: &str) -> Result<()> {
    let ids = scoped_ids(conn, table, scope, value)?;
    write_positions(conn, table, &ids)
}

fn apply_order(
    conn: &rusqlite::Connection,
    table: &str,
    scope: &str,
    value: &str,
    ids: &[String],
) -> Result<()> {
    let existing: HashSet<String> = scoped_ids(conn, table, scope, value)?.into_iter().collect();
    let requested: HashSet<String> = ids.iter().cloned().collect();
    if requested.len() != ids.len() || requested != existing {
        return Err(AppError::BadRequest(
            "Reorder must list every item exactly once".to_string(),
        ));
    }
    write_positions(conn, table, ids)
}
