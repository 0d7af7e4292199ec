use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::FromSqliteRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    pub equipment: Option<String>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    /// `None` for the shared built-in catalog.
    pub user_id: Option<String>,
}

impl Exercise {
    pub fn is_builtin(&self) -> bool {
        self.user_id.is_none()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }

    pub fn to_ref(&self) -> ExerciseRef {
        ExerciseRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

impl FromSqliteRow for Exercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            muscle_group: row.get("muscle_group")?,
            equipment: row.get("equipment")?,
            instructions: row.get("instructions")?,
            image_url: row.get("image_url")?,
            user_id: row.get("user_id")?,
        })
    }
}

/// The part of a catalog exercise a workout keeps a reference to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateExercise {
    pub name: String,
    pub muscle_group: String,
    pub equipment: Option<String>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
}

pub type UpdateExercise = CreateExercise;

#[derive(Debug, Clone, Serialize)]
pub struct MuscleGroup {
    pub name: &'static str,
    pub display_name: &'static str,
}

pub const MUSCLE_GROUPS: &[MuscleGroup] = &[
    MuscleGroup { name: "chest", display_name: "Chest" },
    MuscleGroup { name: "back", display_name: "Back" },
    MuscleGroup { name: "legs", display_name: "Legs" },
    MuscleGroup { name: "shoulders", display_name: "Shoulders" },
    MuscleGroup { name: "arms", display_name: "Arms" },
    MuscleGroup { name: "core", display_name: "Core" },
    MuscleGroup { name: "full_body", display_name: "Full Body" },
    MuscleGroup { name: "cardio", display_name: "Cardio" },
];

pub fn is_known_muscle_group(name: &str) -> bool {
    MUSCLE_GROUPS.iter().any(|group| group.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_muscle_groups() {
        assert!(is_known_muscle_group("chest"));
        assert!(is_known_muscle_group("full_body"));
        assert!(!is_known_muscle_group("Chest"));
        assert!(!is_known_muscle_group(""));
    }

    #[test]
    fn test_ownership() {
        let mut exercise = Exercise {
            id: "e1".to_string(),
            name: "Squat".to_string(),
            muscle_group: "legs".to_string(),
            equipment: None,
            instructions: None,
            image_url: None,
            user_id: None,
        };
        assert!(exercise.is_builtin());
        assert!(!exercise.is_owned_by("u1"));

        exercise.user_id = Some("u1".to_string());
        assert!(!exercise.is_builtin());
        assert!(exercise.is_owned_by("u1"));
        assert!(!exercise.is_owned_by("u2"));
    }
}
