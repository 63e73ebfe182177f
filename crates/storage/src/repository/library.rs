use std::collections::BTreeSet;

use serde::Deserialize;

use crate::backend::{Backend, Order};
use crate::error::Result;
use crate::models::LibraryExercise;

const TABLE: &str = "exercises_library";
const SEARCH_LIMIT: u32 = 50;
const BODY_PART_LIMIT: u32 = 200;

/// Read-only access to the shared exercise catalog
pub struct LibraryRepository<'a> {
    backend: &'a Backend,
}

impl<'a> LibraryRepository<'a> {
    pub fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// The whole catalog, alphabetically
    pub async fn list(&self) -> Result<Vec<LibraryExercise>> {
        self.backend
            .from(TABLE)
            .select(LibraryExercise::COLUMNS)
            .order("name", Order::Ascending)
            .fetch_all()
            .await
    }

    /// Case-insensitive substring match on the name
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<LibraryExercise>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        self.backend
            .from(TABLE)
            .select(LibraryExercise::COLUMNS)
            .ilike("name", format!("%{}%", name))
            .limit(SEARCH_LIMIT)
            .fetch_all()
            .await
    }

    /// `"all"` or an empty body part yields nothing; use [`Self::list`] instead
    pub async fn list_by_body_part(&self, body_part: &str) -> Result<Vec<LibraryExercise>> {
        if body_part.is_empty() || body_part == "all" {
            return Ok(Vec::new());
        }

        self.backend
            .from(TABLE)
            .select(LibraryExercise::COLUMNS)
            .eq("body_part", body_part)
            .limit(BODY_PART_LIMIT)
            .fetch_all()
            .await
    }

    /// Distinct body parts, sorted
    pub async fn body_parts(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Row {
            body_part: Option<String>,
        }

        let rows: Vec<Row> = self
            .backend
            .from(TABLE)
            .select("body_part")
            .fetch_all()
            .await?;

        let parts: BTreeSet<String> = rows
            .into_iter()
            .filter_map(|row| row.body_part)
            .filter(|part| !part.is_empty())
            .collect();

        Ok(parts.into_iter().collect())
    }
}
