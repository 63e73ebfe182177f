use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Read-only catalog entry from the shared `exercises_library` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryExercise {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_part: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub equipment: String,
    #[serde(rename = "target_muscle", default, deserialize_with = "null_as_default")]
    pub target: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: Vec<String>,
    /// Path of the image inside the exercise bucket
    #[serde(default)]
    pub gif_url: Option<String>,
}

impl LibraryExercise {
    pub const COLUMNS: &'static str =
        "id, name, body_part, equipment, gif_url, target_muscle, instructions";
}
