use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::null_as_default;

/// Per-user singleton, keyed by the auth user id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    /// Centimetres
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub height: Option<Decimal>,
    /// Kilograms
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub weight: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorite_exercises: Vec<String>,
}

impl Profile {
    pub fn is_favorite(&self, library_exercise_id: &str) -> bool {
        self.favorite_exercises.iter().any(|id| id == library_exercise_id)
    }
}
