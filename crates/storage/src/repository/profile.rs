use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::backend::Backend;
use crate::dto::profile::{BodyMetricsUpdate, FavoritesUpdate, ProfileUpsert, UpdateProfileRequest};
use crate::error::Result;
use crate::models::Profile;

const TABLE: &str = "profiles";

pub struct ProfileRepository<'a> {
    backend: &'a Backend,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// A brand-new account may not have a profile row yet
    pub async fn find(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.backend
            .from(TABLE)
            .select("*")
            .eq("id", user_id)
            .fetch_optional()
            .await
    }

    /// Create or update the name/age card
    pub async fn upsert(&self, user_id: Uuid, req: &UpdateProfileRequest) -> Result<Profile> {
        let payload = ProfileUpsert {
            id: user_id,
            full_name: req.full_name.clone(),
            age: req.age,
            updated_at: Utc::now(),
        };
        self.backend.from(TABLE).upsert(&payload).await
    }

    pub async fn set_favorites(&self, user_id: Uuid, favorites: &[String]) -> Result<Profile> {
        self.backend
            .from(TABLE)
            .eq("id", user_id)
            .update(&FavoritesUpdate {
                favorite_exercises: favorites,
            })
            .await
    }

    pub async fn set_body_metrics(
        &self,
        user_id: Uuid,
        weight: Decimal,
        height: Decimal,
    ) -> Result<Profile> {
        self.backend
            .from(TABLE)
            .eq("id", user_id)
            .update(&BodyMetricsUpdate {
                weight,
                height,
                updated_at: Utc::now(),
            })
            .await
    }
}
