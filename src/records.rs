//! Strength records derived from workout history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{
    ExerciseRecord, HistoryEntry, NewRecord, ProgressPoint, RecordKind, RecordValue,
    WorkoutExercise,
};

/// Epley: `weight * (1 + reps / 30)`. A single rep is the weight itself.
pub fn estimated_one_rep_max(weight: f64, reps: i32) -> f64 {
    if weight <= 0.0 || reps <= 0 {
        return 0.0;
    }
    if reps == 1 {
        return weight;
    }
    weight * (1.0 + f64::from(reps) / 30.0)
}

pub fn set_volume(weight: f64, reps: i32) -> f64 {
    if weight <= 0.0 || reps <= 0 {
        return 0.0;
    }
    weight * f64::from(reps)
}

/// Volume of the completed working sets in a workout tree.
pub fn workout_volume(exercises: &[WorkoutExercise]) -> f64 {
    exercises
        .iter()
        .flat_map(|e| e.sets.iter())
        .filter(|s| s.completed && !s.is_warmup)
        .map(|s| set_volume(s.weight.unwrap_or(0.0), s.reps.unwrap_or(0)))
        .sum()
}

/// One performed set, as read from history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSample {
    pub exercise_id: String,
    pub exercise_name: String,
    pub history_id: String,
    pub achieved_at: DateTime<Utc>,
    pub weight: f64,
    pub reps: i32,
    pub is_warmup: bool,
}

impl RecordSample {
    fn value(&self, kind: RecordKind) -> f64 {
        match kind {
            RecordKind::MaxWeight => {
                if self.reps > 0 {
                    self.weight.max(0.0)
                } else {
                    0.0
                }
            }
            RecordKind::OneRepMax => estimated_one_rep_max(self.weight, self.reps),
            RecordKind::SetVolume => set_volume(self.weight, self.reps),
        }
    }

    fn record_value(&self, kind: RecordKind) -> RecordValue {
        RecordValue {
            value: self.value(kind),
            reps: self.reps,
            weight: self.weight,
            achieved_at: self.achieved_at,
            history_id: self.history_id.clone(),
        }
    }
}

impl RecordSample {
    /// Samples for every set of a recorded workout whose exercise is still in the catalog.
    pub fn from_entry(entry: &HistoryEntry) -> Vec<RecordSample> {
        entry
            .exercises
            .iter()
            .filter_map(|exercise| {
                let exercise_id = exercise.exercise_id.as_ref()?;
                Some(exercise.sets.iter().map(move |set| RecordSample {
                    exercise_id: exercise_id.clone(),
                    exercise_name: exercise.exercise_name.clone(),
                    history_id: entry.summary.id.clone(),
                    achieved_at: entry.summary.finished_at,
                    weight: set.weight,
                    reps: set.reps,
                    is_warmup: set.is_warmup,
                }))
            })
            .flatten()
            .collect()
    }
}

fn improve(slot: &mut Option<RecordValue>, sample: &RecordSample, kind: RecordKind) {
    let value = sample.value(kind);
    if value <= 0.0 {
        return;
    }
    // Ties keep the earliest achievement
    let better = match slot {
        Some(best) => {
            value > best.value || (value == best.value && sample.achieved_at < best.achieved_at)
        }
        None => true,
    };
    if better {
        *slot = Some(sample.record_value(kind));
    }
}

/// Best values per exercise, sorted by exercise name. Warm-up sets are ignored.
pub fn compute_records(samples: &[RecordSample]) -> Vec<ExerciseRecord> {
    let mut by_exercise: HashMap<&str, ExerciseRecord> = HashMap::new();
    let mut sessions: HashMap<&str, Vec<&str>> = HashMap::new();

    for sample in samples.iter().filter(|s| !s.is_warmup) {
        let record = by_exercise
            .entry(sample.exercise_id.as_str())
            .or_insert_with(|| ExerciseRecord {
                exercise_id: sample.exercise_id.clone(),
                exercise_name: sample.exercise_name.clone(),
                max_weight: None,
                best_one_rep_max: None,
                best_set_volume: None,
                total_volume: 0.0,
                times_performed: 0,
            });

        improve(&mut record.max_weight, sample, RecordKind::MaxWeight);
        improve(&mut record.best_one_rep_max, sample, RecordKind::OneRepMax);
        improve(&mut record.best_set_volume, sample, RecordKind::SetVolume);
        record.total_volume += set_volume(sample.weight, sample.reps);

        let seen = sessions.entry(sample.exercise_id.as_str()).or_default();
        if !seen.contains(&sample.history_id.as_str()) {
            seen.push(sample.history_id.as_str());
            record.times_performed += 1;
        }
    }

    let mut records: Vec<ExerciseRecord> = by_exercise.into_values().collect();
    records.sort_by(|a, b| {
        a.exercise_name
            .cmp(&b.exercise_name)
            .then_with(|| a.exercise_id.cmp(&b.exercise_id))
    });
    records
}

/// Records set by `performed` that beat everything in `prior`.
///
/// An exercise performed for the first time sets a record of every kind it
/// has a positive value for.
pub fn detect_new_records(prior: &[ExerciseRecord], performed: &[RecordSample]) -> Vec<NewRecord> {
    let prior: HashMap<&str, &ExerciseRecord> =
        prior.iter().map(|r| (r.exercise_id.as_str(), r)).collect();

    let mut new_records = Vec::new();
    for record in compute_records(performed) {
        let previous = prior.get(record.exercise_id.as_str());
        for kind in RecordKind::ALL {
            let Some(best) = record.best(kind) else {
                continue;
            };
            let previous_value = previous.and_then(|p| p.best(kind)).map(|v| v.value);
            if previous_value.is_none_or(|p| best.value > p) {
                new_records.push(NewRecord {
                    exercise_id: record.exercise_id.clone(),
                    exercise_name: record.exercise_name.clone(),
                    kind,
                    value: best.value,
                    previous: previous_value,
                });
            }
        }
    }
    new_records
}

/// Per-workout progression of one exercise, oldest first.
pub fn exercise_progress(samples: &[RecordSample]) -> Vec<ProgressPoint> {
    let mut points: Vec<ProgressPoint> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sample in samples.iter().filter(|s| !s.is_warmup) {
        let i = *index.entry(sample.history_id.as_str()).or_insert_with(|| {
            points.push(ProgressPoint {
                history_id: sample.history_id.clone(),
                achieved_at: sample.achieved_at,
                best_one_rep_max: 0.0,
                max_weight: 0.0,
                volume: 0.0,
            });
            points.len() - 1
        });
        let point = &mut points[i];
        point.best_one_rep_max = point
            .best_one_rep_max
            .max(estimated_one_rep_max(sample.weight, sample.reps));
        if sample.reps > 0 {
            point.max_weight = point.max_weight.max(sample.weight);
        }
        point.volume += set_volume(sample.weight, sample.reps);
    }

    points.sort_by_key(|p| p.achieved_at);
    points
}
