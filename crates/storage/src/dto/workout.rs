use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::WorkoutExercise;

/// Full row written on insert and on every in-place save
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutPayload {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub exercises: Vec<WorkoutExercise>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub routine_id: Option<i64>,
}

/// Closes a session: stamps the end and records how long it took
#[derive(Debug, Clone, Serialize)]
pub struct FinishWorkoutRequest {
    pub end_time: DateTime<Utc>,
    pub duration: i64,
}

/// Opens a new session on an existing row. Any earlier end time and
/// duration are cleared so the row reads as in progress.
#[derive(Debug, Clone, Serialize)]
pub struct BeginSessionUpdate {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
    pub exercises: Vec<WorkoutExercise>,
}

impl BeginSessionUpdate {
    pub fn new(start_time: DateTime<Utc>, exercises: Vec<WorkoutExercise>) -> Self {
        Self {
            start_time,
            end_time: None,
            duration: None,
            exercises,
        }
    }
}

/// Sets or clears the start time that marks a session as in progress.
/// `None` is sent as an explicit `null`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionMarkerUpdate {
    pub start_time: Option<DateTime<Utc>>,
}
