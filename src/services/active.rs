//! Workouts in progress, kept in memory per user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::draft::WorkoutDraft;
use crate::error::{AppError, Result};
use crate::models::{ExerciseSet, Workout, WorkoutExercise};

#[derive(Debug, Clone)]
pub struct ActiveWorkout {
    pub draft: WorkoutDraft,
    pub template_id: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ActiveWorkout {
    pub fn new(draft: WorkoutDraft, template_id: Option<String>) -> Self {
        Self {
            draft,
            template_id,
            started_at: Utc::now(),
        }
    }

    pub fn view(&self) -> ActiveWorkoutView {
        ActiveWorkoutView {
            template_id: self.template_id.clone(),
            started_at: self.started_at,
            elapsed_seconds: (Utc::now() - self.started_at).num_seconds().max(0),
            completed_sets: self.draft.completed_set_count(),
            dirty: self.draft.is_dirty(),
            workout: self.draft.current().clone(),
        }
    }

    /// The workout reduced to what was actually done: completed sets only,
    /// and only exercises that kept at least one set.
    pub fn performed(&self) -> Workout {
        let current = self.draft.current();
        let exercises = current
            .exercises
            .iter()
            .filter_map(|exercise| {
                let sets: Vec<ExerciseSet> = exercise
                    .sets
                    .iter()
                    .filter(|s| s.completed)
                    .cloned()
                    .collect();
                if sets.is_empty() {
                    None
                } else {
                    Some(WorkoutExercise {
                        sets,
                        ..exercise.without_sets()
                    })
                }
            })
            .collect();
        Workout {
            exercises,
            ..current.clone()
        }
    }

    /// The performed structure as a template tree, with completion cleared.
    pub fn as_template(&self) -> Workout {
        let mut workout = self.performed();
        for set in workout.exercises.iter_mut().flat_map(|e| e.sets.iter_mut()) {
            set.completed = false;
        }
        workout
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveWorkoutView {
    pub template_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub completed_sets: usize,
    pub dirty: bool,
    pub workout: Workout,
}

/// At most one active workout per user. Mutations of one user's workout hold
/// that entry's lock for their duration.
#[derive(Clone, Default)]
pub struct ActiveWorkoutStore {
    workouts: Arc<DashMap<String, ActiveWorkout>>,
}

impl ActiveWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, user_id: &str, workout: ActiveWorkout) -> Result<ActiveWorkoutView> {
        match self.workouts.entry(user_id.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(
                "A workout is already in progress".to_string(),
            )),
            Entry::Vacant(slot) => {
                let view = workout.view();
                slot.insert(workout);
                Ok(view)
            }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<ActiveWorkout> {
        self.workouts.get(user_id).map(|w| w.value().clone())
    }

    pub fn is_active(&self, user_id: &str) -> bool {
        self.workouts.contains_key(user_id)
    }

    /// Runs `f` against the user's active workout.
    pub fn update<T, F>(&self, user_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut ActiveWorkout) -> Result<T>,
    {
        let mut active = self
            .workouts
            .get_mut(user_id)
            .ok_or_else(|| AppError::not_found("Active workout"))?;
        f(active.value_mut())
    }

    pub fn remove(&self, user_id: &str) -> Option<ActiveWorkout> {
        self.workouts.remove(user_id).map(|(_, w)| w)
    }
}
