use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::null_as_default;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub user_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub routine_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exercises: Vec<WorkoutExercise>,
}

impl Workout {
    /// A started session that has not been finished yet
    pub fn is_in_progress(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// An exercise as performed inside one workout; stored inline in the
/// workout's `exercises` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    /// Client-generated, e.g. `lib-<library id>-<millis>` or `manual-<millis>`
    pub id: String,
    pub name: String,
    #[serde(
        rename = "bodyPart",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub body_part: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sets: Vec<ExerciseSet>,
}

impl WorkoutExercise {
    pub const MANUAL_PREFIX: &'static str = "manual-";

    /// Only exercises typed in by hand can be renamed
    pub fn is_manual(&self) -> bool {
        self.id.starts_with(Self::MANUAL_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseSet {
    #[serde(default)]
    pub reps: i32,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    #[serde(default)]
    pub completed: bool,
}

impl ExerciseSet {
    /// Nothing was entered: not worth persisting
    pub fn is_blank(&self) -> bool {
        self.reps <= 0 && self.weight <= Decimal::ZERO
    }

    /// reps × weight
    pub fn volume(&self) -> Decimal {
        Decimal::from(self.reps) * self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_stored_row() {
        let row = json!({
            "id": 7,
            "user_id": "6f1c1f5e-2a43-4a51-9a36-4a0d3f5b8c10",
            "date": "2024-05-01",
            "start_time": "2024-05-01T08:00:00Z",
            "end_time": null,
            "duration": null,
            "routine_id": 3,
            "created_at": "2024-05-01T08:00:00Z",
            "exercises": [{
                "id": "lib-12-1714550400000",
                "name": "Bench Press",
                "bodyPart": "chest",
                "sets": [{ "reps": 8, "weight": 62.5, "completed": true }]
            }]
        });

        let workout: Workout = serde_json::from_value(row).unwrap();
        assert!(workout.is_in_progress());
        assert_eq!(workout.routine_id, Some(3));
        assert_eq!(workout.exercises[0].body_part.as_deref(), Some("chest"));
        assert_eq!(workout.exercises[0].sets[0].weight, Decimal::new(625, 1));
    }

    #[test]
    fn test_null_exercises_become_empty() {
        let row = json!({
            "id": 1,
            "user_id": "6f1c1f5e-2a43-4a51-9a36-4a0d3f5b8c10",
            "date": "2024-05-01",
            "exercises": null
        });

        let workout: Workout = serde_json::from_value(row).unwrap();
        assert!(workout.exercises.is_empty());
        assert!(!workout.is_in_progress());
    }

    #[test]
    fn test_set_serializes_weight_as_number() {
        let set = ExerciseSet {
            reps: 5,
            weight: Decimal::new(1025, 1),
            completed: false,
        };
        assert_eq!(
            serde_json::to_value(set).unwrap(),
            json!({ "reps": 5, "weight": 102.5, "completed": false })
        );
    }

    #[test]
    fn test_blank_set() {
        assert!(ExerciseSet::default().is_blank());
        assert!(
            ExerciseSet {
                reps: -1,
                weight: Decimal::ZERO,
                completed: true
            }
            .is_blank()
        );
        assert!(
            !ExerciseSet {
                reps: 0,
                weight: Decimal::new(20, 0),
                completed: false
            }
            .is_blank()
        );
    }
}
