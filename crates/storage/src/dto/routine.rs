use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::RoutineExercise;

use super::validate_not_blank;

/// Request payload for creating or editing a routine
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveRoutineRequest {
    #[validate(
        length(max = 255, message = "Routine name must be at most 255 characters"),
        custom(function = "validate_not_blank", message = "Please enter a name for the routine")
    )]
    pub name: String,

    #[validate(length(min = 1, message = "Add at least one exercise to the routine"))]
    pub exercises: Vec<RoutineExercise>,
}

/// Row written to the `routines` table
#[derive(Debug, Clone, Serialize)]
pub struct RoutinePayload<'a> {
    pub name: &'a str,
    pub exercises: &'a [RoutineExercise],
    pub user_id: Uuid,
}
