use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DbPool;
use crate::draft::{ChangeSummary, DraftChanges, WorkoutDraft};
use crate::error::{AppError, Result};
use crate::models::{ExerciseSet, FromSqliteRow, Workout, WorkoutExercise, WorkoutSummary};

const SUMMARY_SELECT: &str = "SELECT w.*,
        (SELECT COUNT(*) FROM workout_exercises we WHERE we.workout_id = w.id) AS exercise_count
     FROM workouts w";

/// Workout templates and their exercise/set trees.
#[derive(Clone)]
pub struct WorkoutRepository {
    pool: DbPool,
}

impl WorkoutRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Templates of a user; `folder_id` limits the list to one folder.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Vec<WorkoutSummary>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let folder_id = folder_id.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let sql = format!(
                "{} WHERE w.user_id = ?1 AND (?2 IS NULL OR w.folder_id = ?2) ORDER BY w.name",
                SUMMARY_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let workouts = stmt
                .query_map(rusqlite::params![user_id, folder_id], WorkoutSummary::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(workouts)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn find_summary(&self, id: &str, user_id: &str) -> Result<Option<WorkoutSummary>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            find_summary(&conn, &id, &user_id)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Full tree of a template owned by `user_id`.
    pub async fn find_tree(&self, id: &str, user_id: &str) -> Result<Option<Workout>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            load_tree(&conn, &id, &user_id)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        notes: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<WorkoutSummary> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        let name = name.trim().to_string();
        let notes = notes.map(|s| s.to_string());
        let folder_id = folder_id.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let id = Uuid::new_v4().to_string();
            insert_workout(&conn, &id, &user_id, folder_id.as_deref(), &name, notes.as_deref())?;
            find_summary(&conn, &id, &user_id)?
                .ok_or_else(|| AppError::Internal("Created workout vanished".to_string()))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Replaces the stored tree with `incoming` by writing only the rows that changed.
    ///
    /// Returns `None` when the template does not exist for this user.
    pub async fn save_revision(
        &self,
        id: &str,
        user_id: &str,
        incoming: Workout,
    ) -> Result<Option<(Workout, ChangeSummary)>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;
            let saved = revise_tree(&tx, &id, &user_id, incoming)?;
            tx.commit()?;
            Ok(saved)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Copies a template with fresh ids and a " (copy)" suffix.
    pub async fn duplicate(&self, id: &str, user_id: &str) -> Result<Option<Workout>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let tx = conn.transaction()?;

            let Some(source) = load_tree(&tx, &id, &user_id)? else {
                return Ok(None);
            };
            let folder_id = find_summary(&tx, &id, &user_id)?.and_then(|s| s.folder_id);

            let name = format!("{} (copy)", source.name);
            let copy = WorkoutDraft::blank(&name);
            let copy_id = copy.current().id.clone();
            insert_workout(&tx, &copy_id, &user_id, folder_id.as_deref(), &name, source.notes.as_deref())?;

            // Against an empty snapshot every id is new, so every row is inserted
            let revised = WorkoutDraft::revise(
                copy.into_current(),
                Workout {
                    name,
                    ..source
                },
            );
            apply_changes(&tx, revised.current(), &revised.diff())?;

            let saved = load_tree(&tx, &copy_id, &user_id)?
                .ok_or_else(|| AppError::Internal("Duplicated workout vanished".to_string()))?;
            tx.commit()?;
            Ok(Some(saved))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn move_to_folder(
        &self,
        id: &str,
        user_id: &str,
        folder_id: Option<&str>,
    ) -> Result<bool> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let user_id = user_id.to_string();
        let folder_id = folder_id.map(|s| s.to_string());
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let rows = conn.execute(
                "UPDATE workouts SET folder_id = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                rusqlite::params![folder_id, Utc::now(), id, user_id],
            )?;
            Ok(rows > 0)
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
                "DELETE FROM workouts WHERE id = ? AND user_id = ?",
                rusqlite::params![id, user_id],
            )?;
            Ok(rows > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

pub(crate) fn find_summary(conn: &Connection, id: &str, user_id: &str) -> Result<Option<WorkoutSummary>> {
    let sql = format!("{} WHERE w.id = ? AND w.user_id = ?", SUMMARY_SELECT);
    let mut stmt = conn.prepare(&sql)?;
    let result = stmt
        .query_row(rusqlite::params![id, user_id], WorkoutSummary::from_row)
        .optional()?;
    Ok(result)
}

fn insert_workout(
    conn: &Connection,
    id: &str,
    user_id: &str,
    folder_id: Option<&str>,
    name: &str,
    notes: Option<&str>,
) -> Result<()> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO workouts (id, user_id, folder_id, name, notes, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![id, user_id, folder_id, name, notes, now, now],
    )?;
    Ok(())
}

pub(crate) fn load_tree(conn: &Connection, id: &str, user_id: &str) -> Result<Option<Workout>> {
    let header: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT name, notes FROM workouts WHERE id = ? AND user_id = ?",
            rusqlite::params![id, user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((name, notes)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT we.*, e.name AS exercise_name
         FROM workout_exercises we
         JOIN exercises e ON we.exercise_id = e.id
         WHERE we.workout_id = ?
         ORDER BY we.position",
    )?;
    let mut exercises = stmt
        .query_map([id], WorkoutExercise::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut set_stmt =
        conn.prepare("SELECT * FROM exercise_sets WHERE workout_exercise_id = ? ORDER BY position")?;
    for exercise in &mut exercises {
        exercise.sets = set_stmt
            .query_map([&exercise.id], ExerciseSet::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
    }

    Ok(Some(Workout {
        id: id.to_string(),
        name,
        notes,
        exercises,
    }))
}

/// Snapshot, revise, diff and apply on an open connection. `None` when the
/// template does not exist for this user.
pub(crate) fn revise_tree(
    conn: &Connection,
    id: &str,
    user_id: &str,
    incoming: Workout,
) -> Result<Option<(Workout, ChangeSummary)>> {
    let Some(snapshot) = load_tree(conn, id, user_id)? else {
        return Ok(None);
    };
    let draft = WorkoutDraft::revise(snapshot, incoming);
    let changes = draft.diff();

    if !changes.is_empty() {
        check_exercises_visible(conn, draft.current(), user_id)?;
        apply_changes(conn, draft.current(), &changes)?;
    }

    let saved = load_tree(conn, id, user_id)?
        .ok_or_else(|| AppError::Internal("Saved workout vanished".to_string()))?;

    tracing::debug!(workout_id = %id, changes = ?changes.summary(), "Saved workout");
    Ok(Some((saved, changes.summary())))
}

/// Removes exercises whose catalog entry is gone or not visible to the user.
pub(crate) fn drop_missing_exercises(
    conn: &Connection,
    workout: &mut Workout,
    user_id: &str,
) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM exercises WHERE id = ? AND (user_id IS NULL OR user_id = ?)",
    )?;
    let mut kept = Vec::with_capacity(workout.exercises.len());
    for exercise in workout.exercises.drain(..) {
        let visible: i64 =
            stmt.query_row(rusqlite::params![exercise.exercise_id, user_id], |row| {
                row.get(0)
            })?;
        if visible > 0 {
            kept.push(exercise);
        }
    }
    workout.exercises = kept;
    Ok(())
}

fn check_exercises_visible(conn: &Connection, workout: &Workout, user_id: &str) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM exercises WHERE id = ? AND (user_id IS NULL OR user_id = ?)",
    )?;
    for exercise in &workout.exercises {
        let visible: i64 =
            stmt.query_row(rusqlite::params![exercise.exercise_id, user_id], |row| {
                row.get(0)
            })?;
        if visible == 0 {
            return Err(AppError::Validation(format!(
                "Unknown exercise: {}",
                exercise.exercise_id
            )));
        }
    }
    Ok(())
}

/// Writes a diff. Deletes run first so that re-parented rows are re-inserted
/// after a cascading delete of their old exercise.
pub(crate) fn apply_changes(conn: &Connection, workout: &Workout, changes: &DraftChanges) -> Result<()> {
    if changes.workout_changed {
        conn.execute(
            "UPDATE workouts SET name = ?, notes = ? WHERE id = ?",
            rusqlite::params![workout.name, workout.notes, workout.id],
        )?;
    }

    for id in &changes.delete_exercise_ids {
        conn.execute(
            "DELETE FROM workout_exercises WHERE id = ? AND workout_id = ?",
            rusqlite::params![id, workout.id],
        )?;
    }
    for id in &changes.delete_set_ids {
        conn.execute("DELETE FROM exercise_sets WHERE id = ?", [id])?;
    }

    let mut upsert_exercise = conn.prepare(
        "INSERT INTO workout_exercises
            (id, workout_id, exercise_id, position, rest_seconds, warmup_rest_seconds, superset_group)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            exercise_id = excluded.exercise_id,
            position = excluded.position,
            rest_seconds = excluded.rest_seconds,
            warmup_rest_seconds = excluded.warmup_rest_seconds,
            superset_group = excluded.superset_group",
    )?;
    for exercise in &changes.upsert_exercises {
        upsert_exercise.execute(rusqlite::params![
            exercise.id,
            workout.id,
            exercise.exercise_id,
            exercise.position,
            exercise.rest_seconds,
            exercise.warmup_rest_seconds,
            exercise.superset_group
        ])?;
    }

    let mut upsert_set = conn.prepare(
        "INSERT INTO exercise_sets
            (id, workout_exercise_id, position, reps, weight, completed, is_warmup, is_dropset,
             rpe, partial_reps, bar_type)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            workout_exercise_id = excluded.workout_exercise_id,
            position = excluded.position,
            reps = excluded.reps,
            weight = excluded.weight,
            completed = excluded.completed,
            is_warmup = excluded.is_warmup,
            is_dropset = excluded.is_dropset,
            rpe = excluded.rpe,
            partial_reps = excluded.partial_reps,
            bar_type = excluded.bar_type",
    )?;
    for change in &changes.upsert_sets {
        let set = &change.set;
        upsert_set.execute(rusqlite::params![
            set.id,
            change.workout_exercise_id,
            set.position,
            set.reps,
            set.weight,
            set.completed,
            set.is_warmup,
            set.is_dropset,
            set.rpe,
            set.partial_reps,
            set.bar_type
        ])?;
    }

    conn.execute(
        "UPDATE workouts SET updated_at = ? WHERE id = ?",
        rusqlite::params![Utc::now(), workout.id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::migrations::run_migrations_for_tests;
    use crate::models::{ExerciseRef, SetPatch};

    fn setup_test_db() -> DbPool {
        let pool = create_memory_pool().expect("Failed to create test database");
        run_migrations_for_tests(&pool).expect("Failed to run migrations");
        let conn = pool.get().unwrap();
        for user_id in ["user1", "user2"] {
            conn.execute(
                "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, 'hash', datetime('now'))",
                rusqlite::params![user_id, user_id],
            )
            .unwrap();
        }
        drop(conn);
        pool
    }

    fn bench() -> ExerciseRef {
        ExerciseRef {
            id: "builtin-bench-press".to_string(),
            name: "Bench Press".to_string(),
        }
    }

    fn squat() -> ExerciseRef {
        ExerciseRef {
            id: "builtin-squat".to_string(),
            name: "Squat".to_string(),
        }
    }

    fn row_count(pool: &DbPool, table: &str) -> i64 {
        let conn = pool.get().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_empty_workout() {
        let repo = WorkoutRepository::new(setup_test_db());

        let summary = repo
            .create("user1", " Push ", Some("Chest focus"), None)
            .await
            .unwrap();
        assert_eq!(summary.name, "Push");
        assert_eq!(summary.exercise_count, 0);

        let tree = repo.find_tree(&summary.id, "user1").await.unwrap().unwrap();
        assert_eq!(tree.name, "Push");
        assert_eq!(tree.notes.as_deref(), Some("Chest focus"));
        assert!(tree.exercises.is_empty());

        assert!(repo.find_tree(&summary.id, "user2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_revision_inserts_then_updates_only_changes() {
        let pool = setup_test_db();
        let repo = WorkoutRepository::new(pool.clone());
        let summary = repo.create("user1", "Push", None, None).await.unwrap();
        let snapshot = repo.find_tree(&summary.id, "user1").await.unwrap().unwrap();

        let mut draft = WorkoutDraft::new(snapshot);
        let draft_bench_id = draft.add_exercise(&bench());
        draft.add_set(&draft_bench_id).unwrap();
        draft.add_exercise(&squat());

        let (saved, summary_counts) = repo
            .save_revision(&summary.id, "user1", draft.current().clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary_counts.exercises_upserted, 2);
        assert_eq!(summary_counts.sets_upserted, 3);
        assert_eq!(saved.exercises.len(), 2);
        assert_eq!(saved.exercises[0].exercise_name, "Bench Press");
        assert_eq!(saved.exercises[0].sets.len(), 2);

        // Ids unknown to the stored snapshot were replaced on save
        let mut draft = WorkoutDraft::new(saved);
        let bench_id = draft.current().exercises[0].id.clone();
        let set_id = draft.current().exercises[0].sets[1].id.clone();
        let squat_id = draft.current().exercises[1].id.clone();
        draft
            .update_set(
                &bench_id,
                &set_id,
                SetPatch {
                    weight: Some(80.0),
                    ..SetPatch::default()
                },
            )
            .unwrap();
        draft.remove_exercise(&squat_id).unwrap();

        let (saved, counts) = repo
            .save_revision(&summary.id, "user1", draft.current().clone())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counts.sets_upserted, 1);
        assert_eq!(counts.exercises_deleted, 1);
        assert_eq!(counts.exercises_upserted, 0);
        assert_eq!(saved.exercises.len(), 1);
        assert_eq!(saved.exercises[0].sets[1].weight, Some(80.0));
        assert_eq!(row_count(&pool, "exercise_sets"), 2);
    }

    #[tokio::test]
    async fn test_save_revision_rejects_foreign_exercises() {
        let pool = setup_test_db();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO exercises (id, name, muscle_group, user_id) VALUES ('private', 'Secret Lift', 'back', 'user2')",
                [],
            )
            .unwrap();
        }
        let repo = WorkoutRepository::new(pool);
        let summary = repo.create("user1", "Pull", None, None).await.unwrap();
        let mut draft = WorkoutDraft::blank("Pull");
        draft.add_exercise(&ExerciseRef {
            id: "private".to_string(),
            name: "Secret Lift".to_string(),
        });

        let err = repo
            .save_revision(&summary.id, "user1", draft.into_current())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_save_revision_for_other_user_is_none() {
        let repo = WorkoutRepository::new(setup_test_db());
        let summary = repo.create("user1", "Push", None, None).await.unwrap();
        let result = repo
            .save_revision(&summary.id, "user2", WorkoutDraft::blank("Hijack").into_current())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_copies_tree_with_new_ids() {
        let pool = setup_test_db();
        let repo = WorkoutRepository::new(pool.clone());
        let summary = repo.create("user1", "Legs", None, None).await.unwrap();
        let mut draft = WorkoutDraft::blank("Legs");
        let squat_id = draft.add_exercise(&squat());
        draft.add_set(&squat_id).unwrap();
        let (original, _) = repo
            .save_revision(&summary.id, "user1", draft.into_current())
            .await
            .unwrap()
            .unwrap();

        let copy = repo.duplicate(&summary.id, "user1").await.unwrap().unwrap();

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Legs (copy)");
        assert_eq!(copy.exercises.len(), 1);
        assert_eq!(copy.exercises[0].sets.len(), 2);
        assert_ne!(copy.exercises[0].id, original.exercises[0].id);
        assert_eq!(row_count(&pool, "exercise_sets"), 4);
        assert!(repo.duplicate(&summary.id, "user2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_children() {
        let pool = setup_test_db();
        let repo = WorkoutRepository::new(pool.clone());
        let summary = repo.create("user1", "Push", None, None).await.unwrap();
        let mut draft = WorkoutDraft::blank("Push");
        draft.add_exercise(&bench());
        repo.save_revision(&summary.id, "user1", draft.into_current())
            .await
            .unwrap();

        assert!(!repo.delete(&summary.id, "user2").await.unwrap());
        assert!(repo.delete(&summary.id, "user1").await.unwrap());
        assert_eq!(row_count(&pool, "workout_exercises"), 0);
        assert_eq!(row_count(&pool, "exercise_sets"), 0);
    }

    #[tokio::test]
    async fn test_find_by_user_filters_by_folder() {
        let pool = setup_test_db();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO splits (id, user_id, name, position, created_at) VALUES ('s1', 'user1', 'PPL', 0, datetime('now'))",
                [],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO folders (id, user_id, split_id, name, position, created_at) VALUES ('f1', 'user1', 's1', 'Push', 0, datetime('now'))",
                [],
            )
            .unwrap();
        }
        let repo = WorkoutRepository::new(pool);
        repo.create("user1", "Push A", None, Some("f1")).await.unwrap();
        let loose = repo.create("user1", "Cardio", None, None).await.unwrap();

        assert_eq!(repo.find_by_user("user1", None).await.unwrap().len(), 2);
        let in_folder = repo.find_by_user("user1", Some("f1")).await.unwrap();
        assert_eq!(in_folder.len(), 1);
        assert_eq!(in_folder[0].name, "Push A");

        assert!(repo
            .move_to_folder(&loose.id, "user1", Some("f1"))
            .await
            .unwrap());
        assert_eq!(repo.find_by_user("user1", Some("f1")).await.unwrap().len(), 2);
    }
}
