use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request payload for logging today's body metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewMeasurementRequest {
    /// Kilograms
    #[validate(
        required(message = "Please enter both height and weight"),
        custom(function = "validate_positive", message = "Weight must be greater than zero")
    )]
    pub weight: Option<Decimal>,

    /// Centimetres
    #[validate(
        required(message = "Please enter both height and weight"),
        custom(function = "validate_positive", message = "Height must be greater than zero")
    )]
    pub height: Option<Decimal>,
}

fn validate_positive(value: &Decimal) -> Result<(), validator::ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(validator::ValidationError::new("not_positive"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasurementInsert {
    pub user_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub height: Decimal,
}

/// Replaces today's sample and moves its timestamp to now
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementUpdate {
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub height: Decimal,
    pub created_at: DateTime<Utc>,
}
