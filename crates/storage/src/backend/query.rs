use std::fmt::Display;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use super::Backend;
use crate::error::{Result, StorageError};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Row-level query against one REST table.
///
/// Filters follow PostgREST's `column=op.value` convention:
///
/// ```
/// use storage::backend::{Backend, BackendConfig, Order};
///
/// let backend = Backend::new(&BackendConfig::new("https://demo.supabase.co", "anon")).unwrap();
/// let query = backend
///     .from("workouts")
///     .select("*")
///     .eq("user_id", "42")
///     .order("date", Order::Descending);
///
/// assert!(query.params().contains(&("user_id".to_string(), "eq.42".to_string())));
/// assert!(query.params().contains(&("order".to_string(), "date.desc".to_string())));
/// ```
pub struct Query<'a> {
    backend: &'a Backend,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(backend: &'a Backend, table: &str) -> Self {
        Self {
            backend,
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.retain(|(key, _)| key != "select");
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lte", value)
    }

    /// Case-insensitive `LIKE`; `%` is the wildcard
    pub fn ilike(self, column: &str, pattern: impl Display) -> Self {
        self.filter(column, "ilike", pattern)
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.params
            .push(("order".to_string(), format!("{}.{}", column, order.as_str())));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.params
            .push((column.to_string(), format!("{}.{}", op, value)));
        self
    }

    async fn request(&self, method: Method) -> Result<RequestBuilder> {
        self.backend.ensure_fresh_session().await?;
        Ok(self
            .backend
            .request(method, &format!("/rest/v1/{}", self.table))
            .query(&self.params))
    }

    /// All matching rows
    pub async fn fetch_all<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let response = Backend::check(self.request(Method::GET).await?.send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// Exactly one row, or `None` when nothing matched
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let response = self
            .request(Method::GET)
            .await?
            .header("Accept", SINGLE_OBJECT)
            .send()
            .await?;

        // PostgREST answers 406 when a single-object request matches no row
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Ok(None);
        }

        let response = Backend::check(response).await?;
        Ok(Some(response.json::<T>().await?))
    }

    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T> {
        self.fetch_optional().await?.ok_or(StorageError::NotFound)
    }

    /// Insert one row and return it as stored
    pub async fn insert<B, T>(self, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.write(Method::POST, body, "return=representation").await
    }

    /// Update the single matching row and return it
    pub async fn update<B, T>(self, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.write(Method::PATCH, body, "return=representation").await
    }

    /// Insert, or merge into the row with the same primary key
    pub async fn upsert<B, T>(self, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.write(
            Method::POST,
            body,
            "return=representation,resolution=merge-duplicates",
        )
        .await
    }

    async fn write<B, T>(self, method: Method, body: &B, prefer: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(method)
            .await?
            .header("Prefer", prefer)
            .header("Accept", SINGLE_OBJECT)
            .json(body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(StorageError::NotFound);
        }

        let response = Backend::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Delete matching rows; returns how many were removed
    pub async fn delete(self) -> Result<usize> {
        let response = self
            .request(Method::DELETE)
            .await?
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = Backend::check(response).await?;

        let removed = response.json::<Vec<serde_json::Value>>().await?;
        if removed.is_empty() {
            return Err(StorageError::NotFound);
        }

        Ok(removed.len())
    }
}
