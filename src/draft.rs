//! In-memory editing model for a workout.
//!
//! A [`WorkoutDraft`] keeps the workout as it was loaded (`original`) next to
//! the copy being edited (`current`). Every edit keeps exercise and set
//! positions sequential from zero. [`WorkoutDraft::diff`] reports which rows
//! have to be written or removed to turn the stored workout into the edited
//! one.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ExerciseRef, ExerciseSet, SetPatch, Workout, WorkoutExercise};

pub const MAX_RPE: f64 = 10.0;
pub const MIN_RPE: f64 = 1.0;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A set row to write, together with the exercise it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetChange {
    pub workout_exercise_id: String,
    pub set: ExerciseSet,
}

/// The rows that differ between the original and the edited workout.
///
/// Sets that disappear together with their exercise are not listed; the
/// exercise delete removes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftChanges {
    pub workout_changed: bool,
    pub upsert_exercises: Vec<WorkoutExercise>,
    pub delete_exercise_ids: Vec<String>,
    pub upsert_sets: Vec<SetChange>,
    pub delete_set_ids: Vec<String>,
}

impl DraftChanges {
    pub fn is_empty(&self) -> bool {
        !self.workout_changed
            && self.upsert_exercises.is_empty()
            && self.delete_exercise_ids.is_empty()
            && self.upsert_sets.is_empty()
            && self.delete_set_ids.is_empty()
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            workout_changed: self.workout_changed,
            exercises_upserted: self.upsert_exercises.len(),
            exercises_deleted: self.delete_exercise_ids.len(),
            sets_upserted: self.upsert_sets.len(),
            sets_deleted: self.delete_set_ids.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub workout_changed: bool,
    pub exercises_upserted: usize,
    pub exercises_deleted: usize,
    pub sets_upserted: usize,
    pub sets_deleted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutDraft {
    original: Workout,
    current: Workout,
}

impl WorkoutDraft {
    pub fn new(workout: Workout) -> Self {
        let mut current = workout;
        renumber(&mut current);
        Self {
            original: current.clone(),
            current,
        }
    }

    /// A workout that has never been saved.
    pub fn blank(name: &str) -> Self {
        Self::new(Workout {
            id: new_id(),
            name: name.to_string(),
            notes: None,
            exercises: Vec::new(),
        })
    }

    /// Builds a draft from a stored snapshot and an edited tree sent by a client.
    ///
    /// Ids the snapshot does not know, and repeated ids, are replaced with
    /// fresh ones so an edit can never address rows outside this workout.
    /// Positions follow list order.
    pub fn revise(snapshot: Workout, incoming: Workout) -> Self {
        let known_exercises: HashSet<&str> =
            snapshot.exercises.iter().map(|e| e.id.as_str()).collect();
        let known_sets: HashSet<&str> = snapshot
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter().map(|s| s.id.as_str()))
            .collect();

        let mut current = incoming;
        current.id = snapshot.id.clone();

        let mut seen_exercises = HashSet::new();
        let mut seen_sets = HashSet::new();
        for exercise in &mut current.exercises {
            if !known_exercises.contains(exercise.id.as_str())
                || !seen_exercises.insert(exercise.id.clone())
            {
                exercise.id = new_id();
            }
            for set in &mut exercise.sets {
                if !known_sets.contains(set.id.as_str()) || !seen_sets.insert(set.id.clone()) {
                    set.id = new_id();
                }
            }
        }
        renumber(&mut current);

        let mut original = snapshot;
        renumber(&mut original);
        Self { original, current }
    }

    pub fn original(&self) -> &Workout {
        &self.original
    }

    pub fn current(&self) -> &Workout {
        &self.current
    }

    pub fn into_current(self) -> Workout {
        self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.original != self.current
    }

    /// Accepts the current state as saved.
    pub fn commit(&mut self) {
        self.original = self.current.clone();
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Workout name is required".to_string()));
        }
        self.current.name = name.to_string();
        Ok(())
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.current.notes = notes.filter(|n| !n.trim().is_empty());
    }

    // Exercises

    /// Appends an exercise with one empty set and returns its id.
    pub fn add_exercise(&mut self, exercise: &ExerciseRef) -> String {
        let id = new_id();
        self.current.exercises.push(WorkoutExercise {
            id: id.clone(),
            exercise_id: exercise.id.clone(),
            exercise_name: exercise.name.clone(),
            position: self.current.exercises.len() as i32,
            rest_seconds: None,
            warmup_rest_seconds: None,
            superset_group: None,
            sets: vec![ExerciseSet {
                id: new_id(),
                ..ExerciseSet::default()
            }],
        });
        id
    }

    pub fn remove_exercise(&mut self, id: &str) -> Result<()> {
        let index = self.exercise_index(id)?;
        let removed = self.current.exercises.remove(index);
        if let Some(group) = removed.superset_group {
            self.dissolve_lonely_superset(&group);
        }
        renumber(&mut self.current);
        Ok(())
    }

    pub fn move_exercise(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.current.exercises.len();
        if from >= len || to >= len {
            return Err(AppError::BadRequest(format!(
                "Cannot move exercise from {} to {} in a workout with {} exercises",
                from, to, len
            )));
        }
        let exercise = self.current.exercises.remove(from);
        self.current.exercises.insert(to, exercise);
        renumber(&mut self.current);
        Ok(())
    }

    /// Swaps the catalog exercise while keeping the planned sets.
    pub fn replace_exercise(&mut self, id: &str, exercise: &ExerciseRef) -> Result<()> {
        let target = self.exercise_mut(id)?;
        if target.exercise_id == exercise.id {
            return Ok(());
        }
        target.exercise_id = exercise.id.clone();
        target.exercise_name = exercise.name.clone();
        for set in &mut target.sets {
            set.completed = false;
        }
        Ok(())
    }

    pub fn set_rest_timers(
        &mut self,
        id: &str,
        rest_seconds: Option<i32>,
        warmup_rest_seconds: Option<i32>,
    ) -> Result<()> {
        if rest_seconds.is_some_and(|s| s < 0) || warmup_rest_seconds.is_some_and(|s| s < 0) {
            return Err(AppError::Validation(
                "Rest timers cannot be negative".to_string(),
            ));
        }
        let target = self.exercise_mut(id)?;
        target.rest_seconds = rest_seconds;
        target.warmup_rest_seconds = warmup_rest_seconds;
        Ok(())
    }

    /// Tags the given exercises as one superset and returns the tag.
    pub fn group_superset(&mut self, ids: &[String]) -> Result<String> {
        let unique: HashSet<&str> = ids.iter().map(String::as_str).collect();
        if unique.len() < 2 {
            return Err(AppError::Validation(
                "A superset needs at least two exercises".to_string(),
            ));
        }
        for id in &unique {
            self.exercise_index(id)?;
        }

        let group = new_id();
        let mut previous_groups = HashSet::new();
        for exercise in &mut self.current.exercises {
            if unique.contains(exercise.id.as_str()) {
                if let Some(old) = exercise.superset_group.replace(group.clone()) {
                    previous_groups.insert(old);
                }
            }
        }
        for old in previous_groups {
            self.dissolve_lonely_superset(&old);
        }
        Ok(group)
    }

    pub fn ungroup_superset(&mut self, id: &str) -> Result<()> {
        let target = self.exercise_mut(id)?;
        if let Some(group) = target.superset_group.take() {
            self.dissolve_lonely_superset(&group);
        }
        Ok(())
    }

    fn dissolve_lonely_superset(&mut self, group: &str) {
        let members: Vec<usize> = self
            .current
            .exercises
            .iter()
            .enumerate()
            .filter(|(_, e)| e.superset_group.as_deref() == Some(group))
            .map(|(i, _)| i)
            .collect();
        if members.len() == 1 {
            self.current.exercises[members[0]].superset_group = None;
        }
    }

    // Sets

    /// Appends a set that starts from the previous set's load.
    pub fn add_set(&mut self, exercise_id: &str) -> Result<String> {
        let target = self.exercise_mut(exercise_id)?;
        let id = new_id();
        let template = target.sets.last().cloned().unwrap_or_default();
        target.sets.push(ExerciseSet {
            id: id.clone(),
            position: target.sets.len() as i32,
            reps: template.reps,
            weight: template.weight,
            bar_type: template.bar_type,
            ..ExerciseSet::default()
        });
        Ok(id)
    }

    pub fn remove_set(&mut self, exercise_id: &str, set_id: &str) -> Result<()> {
        let target = self.exercise_mut(exercise_id)?;
        let index = set_index(target, set_id)?;
        target.sets.remove(index);
        renumber_sets(target);
        Ok(())
    }

    pub fn move_set(&mut self, exercise_id: &str, from: usize, to: usize) -> Result<()> {
        let target = self.exercise_mut(exercise_id)?;
        let len = target.sets.len();
        if from >= len || to >= len {
            return Err(AppError::BadRequest(format!(
                "Cannot move set from {} to {} in an exercise with {} sets",
                from, to, len
            )));
        }
        let set = target.sets.remove(from);
        target.sets.insert(to, set);
        renumber_sets(target);
        Ok(())
    }

    pub fn update_set(&mut self, exercise_id: &str, set_id: &str, patch: SetPatch) -> Result<()> {
        validate_patch(&patch)?;
        let target = self.exercise_mut(exercise_id)?;
        let index = set_index(target, set_id)?;
        let set = &mut target.sets[index];

        if let Some(reps) = patch.reps {
            set.reps = Some(reps);
        }
        if let Some(weight) = patch.weight {
            set.weight = Some(weight);
        }
        if let Some(rpe) = patch.rpe {
            set.rpe = Some(rpe);
        }
        if let Some(partial_reps) = patch.partial_reps {
            set.partial_reps = Some(partial_reps);
        }
        if let Some(bar_type) = patch.bar_type {
            set.bar_type = Some(bar_type).filter(|b| !b.trim().is_empty());
        }
        if let Some(is_warmup) = patch.is_warmup {
            set.is_warmup = is_warmup;
        }
        if let Some(is_dropset) = patch.is_dropset {
            set.is_dropset = is_dropset;
        }
        if let Some(completed) = patch.completed {
            set.completed = completed;
        }
        Ok(())
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_set_complete(&mut self, exercise_id: &str, set_id: &str) -> Result<bool> {
        let target = self.exercise_mut(exercise_id)?;
        let index = set_index(target, set_id)?;
        let set = &mut target.sets[index];
        set.completed = !set.completed;
        Ok(set.completed)
    }

    pub fn completed_set_count(&self) -> usize {
        self.current
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.completed)
            .count()
    }

    // Diff

    pub fn diff(&self) -> DraftChanges {
        let mut changes = DraftChanges {
            workout_changed: self.original.name != self.current.name
                || self.original.notes != self.current.notes,
            ..DraftChanges::default()
        };

        let original_exercises: HashMap<&str, &WorkoutExercise> = self
            .original
            .exercises
            .iter()
            .map(|e| (e.id.as_str(), e))
            .collect();
        let original_sets: HashMap<&str, (&str, &ExerciseSet)> = self
            .original
            .exercises
            .iter()
            .flat_map(|e| e.sets.iter().map(move |s| (s.id.as_str(), (e.id.as_str(), s))))
            .collect();

        let current_exercise_ids: HashSet<&str> =
            self.current.exercises.iter().map(|e| e.id.as_str()).collect();
        let mut current_set_ids = HashSet::new();

        for exercise in &self.current.exercises {
            let unchanged = original_exercises
                .get(exercise.id.as_str())
                .is_some_and(|o| o.same_row(exercise));
            if !unchanged {
                changes.upsert_exercises.push(exercise.without_sets());
            }

            for set in &exercise.sets {
                current_set_ids.insert(set.id.as_str());
                let unchanged = original_sets
                    .get(set.id.as_str())
                    .is_some_and(|(parent, o)| *parent == exercise.id && *o == set);
                if !unchanged {
                    changes.upsert_sets.push(SetChange {
                        workout_exercise_id: exercise.id.clone(),
                        set: set.clone(),
                    });
                }
            }
        }

        for exercise in &self.original.exercises {
            if !current_exercise_ids.contains(exercise.id.as_str()) {
                changes.delete_exercise_ids.push(exercise.id.clone());
                continue;
            }
            for set in &exercise.sets {
                if !current_set_ids.contains(set.id.as_str()) {
                    changes.delete_set_ids.push(set.id.clone());
                }
            }
        }

        changes
    }

    fn exercise_index(&self, id: &str) -> Result<usize> {
        self.current
            .exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| AppError::not_found("Workout exercise"))
    }

    fn exercise_mut(&mut self, id: &str) -> Result<&mut WorkoutExercise> {
        let index = self.exercise_index(id)?;
        Ok(&mut self.current.exercises[index])
    }
}

fn set_index(exercise: &WorkoutExercise, set_id: &str) -> Result<usize> {
    exercise
        .sets
        .iter()
        .position(|s| s.id == set_id)
        .ok_or_else(|| AppError::not_found("Set"))
}

fn renumber(workout: &mut Workout) {
    for (position, exercise) in workout.exercises.iter_mut().enumerate() {
        exercise.position = position as i32;
        renumber_sets(exercise);
    }
}

fn renumber_sets(exercise: &mut WorkoutExercise) {
    for (position, set) in exercise.sets.iter_mut().enumerate() {
        set.position = position as i32;
    }
}

fn validate_patch(patch: &SetPatch) -> Result<()> {
    if patch.reps.is_some_and(|r| r < 0) {
        return Err(AppError::Validation("Reps cannot be negative".to_string()));
    }
    if patch.partial_reps.is_some_and(|r| r < 0) {
        return Err(AppError::Validation(
            "Partial reps cannot be negative".to_string(),
        ));
    }
    if patch.weight.is_some_and(|w| !w.is_finite() || w < 0.0) {
        return Err(AppError::Validation(
            "Weight must be a non-negative number".to_string(),
        ));
    }
    if patch
        .rpe
        .is_some_and(|r| !r.is_finite() || !(MIN_RPE..=MAX_RPE).contains(&r))
    {
        return Err(AppError::Validation(format!(
            "RPE must be between {} and {}",
            MIN_RPE, MAX_RPE
        )));
    }
    Ok(())
}

/// Checks every set of a client-supplied tree with the same rules as [`WorkoutDraft::update_set`].
pub fn validate_workout(workout: &Workout) -> Result<()> {
    if workout.name.trim().is_empty() {
        return Err(AppError::Validation("Workout name is required".to_string()));
    }
    for exercise in &workout.exercises {
        if exercise.rest_seconds.is_some_and(|s| s < 0)
            || exercise.warmup_rest_seconds.is_some_and(|s| s < 0)
        {
            return Err(AppError::Validation(
                "Rest timers cannot be negative".to_string(),
            ));
        }
        for set in &exercise.sets {
            validate_patch(&SetPatch {
                reps: set.reps,
                weight: set.weight,
                rpe: set.rpe,
                partial_reps: set.partial_reps,
                ..SetPatch::default()
            })?;
        }
    }
    Ok(())
}
