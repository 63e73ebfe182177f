use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::backend::{Backend, Order};
use crate::dto::workout::{
    BeginSessionUpdate, FinishWorkoutRequest, SessionMarkerUpdate, WorkoutPayload,
};
use crate::error::Result;
use crate::models::Workout;

const TABLE: &str = "workouts";

pub struct WorkoutRepository<'a> {
    backend: &'a Backend,
}

impl<'a> WorkoutRepository<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// All workouts of a user, newest date first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Workout>> {
        self.backend
            .from(TABLE)
            .select("*")
            .eq("user_id", user_id)
            .order("date", Order::Descending)
            .fetch_all()
            .await
    }

    /// Find the workout logged on a date.
    ///
    /// Nothing stops two rows sharing a date; the oldest one wins.
    pub async fn find_by_date(&self, user_id: Uuid, date: NaiveDate) -> Result<Option<Workout>> {
        let workouts: Vec<Workout> = self
            .backend
            .from(TABLE)
            .select("*")
            .eq("user_id", user_id)
            .eq("date", date)
            .order("id", Order::Ascending)
            .fetch_all()
            .await?;

        if workouts.len() > 1 {
            tracing::warn!("{} workouts share the date {}", workouts.len(), date);
        }

        Ok(workouts.into_iter().next())
    }

    /// Find workout by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Workout> {
        self.backend
            .from(TABLE)
            .select("*")
            .eq("id", id)
            .fetch_one()
            .await
    }

    /// Create a new workout
    pub async fn create(&self, payload: &WorkoutPayload) -> Result<Workout> {
        self.backend.from(TABLE).insert(payload).await
    }

    /// Overwrite an existing workout in place
    pub async fn update(&self, id: i64, payload: &WorkoutPayload) -> Result<Workout> {
        self.backend.from(TABLE).eq("id", id).update(payload).await
    }

    /// Stamp the end time and duration of a session
    pub async fn finish(&self, id: i64, request: &FinishWorkoutRequest) -> Result<Workout> {
        self.backend.from(TABLE).eq("id", id).update(request).await
    }

    /// Mark an existing row in progress from `update.start_time`
    pub async fn begin_session(&self, id: i64, update: &BeginSessionUpdate) -> Result<Workout> {
        self.backend.from(TABLE).eq("id", id).update(update).await
    }

    /// Set or clear the in-progress marker
    pub async fn set_start_time(
        &self,
        id: i64,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Workout> {
        self.backend
            .from(TABLE)
            .eq("id", id)
            .update(&SessionMarkerUpdate { start_time })
            .await
    }

    /// Delete a workout by ID
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.backend.from(TABLE).eq("id", id).delete().await?;
        Ok(())
    }
}
