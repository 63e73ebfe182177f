use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::backend::{Backend, Order};
use crate::dto::measurement::{MeasurementInsert, MeasurementUpdate};
use crate::error::Result;
use crate::models::Measurement;

const TABLE: &str = "measurements";

pub struct MeasurementRepository<'a> {
    backend: &'a Backend,
}

impl<'a> MeasurementRepository<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Oldest first, as charts read them
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Measurement>> {
        self.backend
            .from(TABLE)
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", Order::Ascending)
            .fetch_all()
            .await
    }

    /// The sample recorded within `[from, to]`, if any
    pub async fn find_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Measurement>> {
        let rows: Vec<Measurement> = self
            .backend
            .from(TABLE)
            .select("*")
            .eq("user_id", user_id)
            .gte("created_at", from.to_rfc3339())
            .lte("created_at", to.to_rfc3339())
            .order("created_at", Order::Ascending)
            .fetch_all()
            .await?;

        Ok(rows.into_iter().next())
    }

    pub async fn create(&self, user_id: Uuid, weight: Decimal, height: Decimal) -> Result<Measurement> {
        self.backend
            .from(TABLE)
            .insert(&MeasurementInsert {
                user_id,
                weight,
                height,
            })
            .await
    }

    pub async fn update(
        &self,
        id: i64,
        weight: Decimal,
        height: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Measurement> {
        self.backend
            .from(TABLE)
            .eq("id", id)
            .update(&MeasurementUpdate {
                weight,
                height,
                created_at: at,
            })
            .await
    }
}
