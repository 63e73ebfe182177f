use uuid::Uuid;

use crate::backend::{Backend, Order};
use crate::dto::routine::{RoutinePayload, SaveRoutineRequest};
use crate::error::Result;
use crate::models::Routine;

const TABLE: &str = "routines";

pub struct RoutineRepository<'a> {
    backend: &'a Backend,
}

impl<'a> RoutineRepository<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// List a user's routines by name
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Routine>> {
        self.backend
            .from(TABLE)
            .select("*")
            .eq("user_id", user_id)
            .order("name", Order::Ascending)
            .fetch_all()
            .await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Routine> {
        self.backend
            .from(TABLE)
            .select("*")
            .eq("id", id)
            .fetch_one()
            .await
    }

    pub async fn create(&self, user_id: Uuid, req: &SaveRoutineRequest) -> Result<Routine> {
        let payload = RoutinePayload {
            name: req.name.trim(),
            exercises: &req.exercises,
            user_id,
        };
        self.backend.from(TABLE).insert(&payload).await
    }

    pub async fn update(&self, id: i64, user_id: Uuid, req: &SaveRoutineRequest) -> Result<Routine> {
        let payload = RoutinePayload {
            name: req.name.trim(),
            exercises: &req.exercises,
            user_id,
        };
        self.backend.from(TABLE).eq("id", id).update(&payload).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.backend.from(TABLE).eq("id", id).delete().await?;
        Ok(())
    }
}
