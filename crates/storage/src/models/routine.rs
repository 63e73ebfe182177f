use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::null_as_default;

/// A named template of exercises used to prefill a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: i64,
    pub name: String,
    pub user_id: Uuid,
    #[serde(default, deserialize_with = "null_as_default")]
    pub exercises: Vec<RoutineExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineExercise {
    pub id: String,
    pub name: String,
    #[serde(
        rename = "bodyPart",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub body_part: Option<String>,
}
