use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request payload for editing the profile card
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub full_name: Option<String>,

    #[validate(range(min = 1, max = 120, message = "Age must be between 1 and 120"))]
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpsert {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoritesUpdate<'a> {
    pub favorite_exercises: &'a [String],
}

/// Latest body metrics mirrored onto the profile
#[derive(Debug, Clone, Serialize)]
pub struct BodyMetricsUpdate {
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub height: Decimal,
    pub updated_at: DateTime<Utc>,
}
