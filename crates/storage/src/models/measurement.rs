use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dated body-metric sample; at most one per user per calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub weight: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub height: Option<Decimal>,
}
