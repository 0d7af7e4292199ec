use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{CreateExercise, Exercise, FromSqliteRow};

#[derive(Clone)]
pub struct ExerciseRepository {
    pool: DbPool,
}

impl ExerciseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Exercise>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare("SELECT * FROM exercises WHERE id = ?")?;
            let result = stmt.query_row([&id], Exercise::from_row).optional()?;
            Ok(result)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// An exercise the user may put into a workout: built-in or their own.
    pub async fn find_visible(&self, id: &str, user_id: &str) -> Result<Option<Exercise>> {
        let exercise = self.find_by_id(id).await?;
        Ok(exercise.filter(|e| e.is_builtin() || e.is_owned_by(user_id)))
    }

    /// Built-in exercises plus the user's own, optionally limited to one muscle group.
    pub async fn find_available_for_user(
        &self,
        user_id: &str,
        muscle_group: Option<&str>,
    ) -> Result<Vec<Exercise>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let muscle_group = muscle_group.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT * FROM exercises
                 WHERE (user_id IS NULL OR user_id = ?1)
                   AND (?2 IS NULL OR muscle_group = ?2)
                 ORDER BY muscle_group, name",
            )?;
            let exercises = stmt
                .query_map(rusqlite::params![user_id, muscle_group], Exercise::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(exercises)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn create(&self, user_id: &str, form: &CreateExercise) -> Result<Exercise> {
        let exercise = Exercise {
            id: Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            muscle_group: form.muscle_group.clone(),
            equipment: form.equipment.clone(),
            instructions: form.instructions.clone(),
            image_url: form.image_url.clone(),
            user_id: Some(user_id.to_string()),
        };
        let exercise_clone = exercise.clone();

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO exercises (id, name, muscle_group, equipment, instructions, image_url, user_id)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    exercise_clone.id,
                    exercise_clone.name,
                    exercise_clone.muscle_group,
                    exercise_clone.equipment,
                    exercise_clone.instructions,
                    exercise_clone.image_url,
                    exercise_clone.user_id
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

        Ok(exercise)
    }

    pub async fn update(&self, id: &str, user_id: &str, form: &CreateExercise) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        let name = form.name.trim().to_string();
        let muscle_group = form.muscle_group.clone();
        let equipment = form.equipment.clone();
        let instructions = form.instructions.clone();
        let image_url = form.image_url.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE exercises
                 SET name = ?, muscle_group = ?, equipment = ?, instructions = ?, image_url = ?
                 WHERE id = ? AND user_id = ?",
                rusqlite::params![
                    name,
                    muscle_group,
                    equipment,
                    instructions,
                    image_url,
                    id,
                    user_id
                ],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Deleting cascades out of templates, whose remaining exercises are
    /// renumbered; history keeps the exercise name.
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let affected: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT DISTINCT workout_id FROM workout_exercises WHERE exercise_id = ?",
                )?;
                let ids = stmt
                    .query_map([&id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<String>>>()?;
                ids
            };

            let rows = tx.execute(
                "DELETE FROM exercises WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            if rows == 0 {
                return Ok(false);
            }

            for workout_id in &affected {
                renumber_workout(&tx, workout_id)?;
            }
            tx.commit()?;

            tracing::debug!(exercise_id = %id, templates = affected.len(), "Deleted exercise");
            Ok(true)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

fn renumber_workout(conn: &Connection, workout_id: &str) -> Result<()> {
    let ids = {
        let mut stmt =
            conn.prepare("SELECT id FROM workout_exercises WHERE workout_id = ? ORDER BY position")?;
        let ids = stmt
            .query_map([workout_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        ids
    };
    let mut update = conn.prepare("UPDATE workout_exercises SET position = ? WHERE id = ?")?;
    for (position, id) in ids.iter().enumerate() {
        update.execute(rusqlite::params![position as i32, id])?;
    }
    Ok(())
}
