pub mod auth;
pub mod query;
pub mod session_store;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, StorageError};

pub use auth::{Auth, AuthSession, AuthUser, OAuthProvider, SignUpOutcome};
pub use query::{Order, Query};
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};

/// Used when a library exercise has no image of its own.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://images.pexels.com/photos/1552242/pexels-photo-1552242.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop";

#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://<ref>.supabase.co`
    pub url: String,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Handle to the hosted backend: REST tables, auth and public file storage.
///
/// Cheap to clone; clones share the HTTP connection pool and the signed-in
/// session.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<Inner>,
}

type Now = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Persists rotated sessions and tells the time that expiry is judged by
#[derive(Clone)]
struct Keeper {
    sessions: Arc<dyn SessionStore>,
    now: Now,
}

struct Inner {
    client: Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<AuthSession>>,
    keeper: RwLock<Option<Keeper>>,
    refreshing: tokio::sync::Mutex<()>,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                session: RwLock::new(None),
                keeper: RwLock::new(None),
                refreshing: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Start a query against a REST table
    pub fn from(&self, table: &str) -> Query<'_> {
        Query::new(self, table)
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(self)
    }

    /// Public URL of an object in a publicly readable bucket
    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.inner.base_url,
            bucket,
            path.trim_start_matches('/')
        )
    }

    pub fn session(&self) -> Option<AuthSession> {
        match self.inner.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_session(&self, session: Option<AuthSession>) {
        let mut guard = match self.inner.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = session;
    }

    /// Keep the session alive: table requests refresh an expired access
    /// token first and the rotated session is saved to `sessions`.
    ///
    /// Without a keeper expiry is judged by the wall clock and refreshed
    /// sessions are not persisted.
    pub fn keep_session<F>(&self, sessions: Arc<dyn SessionStore>, now: F)
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        let mut guard = match self.inner.keeper.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Keeper {
            sessions,
            now: Arc::new(now),
        });
    }

    fn keeper(&self) -> Option<Keeper> {
        match self.inner.keeper.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Refresh the signed-in session when its access token has run out
    pub async fn ensure_fresh_session(&self) -> Result<()> {
        let keeper = self.keeper();
        let now = keeper.as_ref().map_or_else(Utc::now, |k| (k.now)());
        if !self.session().is_some_and(|s| s.is_expired(now)) {
            return Ok(());
        }

        let _refreshing = self.inner.refreshing.lock().await;
        // a concurrent request may have refreshed while this one waited
        let Some(session) = self.session().filter(|s| s.is_expired(now)) else {
            return Ok(());
        };

        info!("Access token expired, refreshing");
        let refreshed = self.auth().refresh(&session.refresh_token).await?;
        if let Some(keeper) = keeper {
            keeper.sessions.save(&refreshed).await?;
        }
        Ok(())
    }

    /// Id of the signed-in user
    pub fn user_id(&self) -> Result<Uuid> {
        self.session()
            .map(|s| s.user.id)
            .ok_or(StorageError::NotAuthenticated)
    }

    /// Request authorized as the signed-in user, or as anon when signed out
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self
            .session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.inner.anon_key.clone());

        self.request_with_token(method, path, &bearer)
    }

    /// Request authorized as anon regardless of the signed-in session
    pub(crate) fn anon_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_with_token(method, path, &self.inner.anon_key)
    }

    pub(crate) fn request_with_token(
        &self,
        method: Method,
        path: &str,
        token: &str,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("{} {}", method, url);

        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
    }

    /// Turn a non-2xx response into a `StorageError`
    pub(crate) async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = parse_error_body(&body);
        let message = message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

        if status == StatusCode::UNAUTHORIZED {
            return Err(StorageError::Unauthorized(message));
        }
        if code.as_deref() == Some("23505") || status == StatusCode::CONFLICT {
            return Err(StorageError::ConstraintViolation(message));
        }

        Err(StorageError::Api {
            status,
            code,
            message,
        })
    }
}

/// Both PostgREST (`code`/`message`) and GoTrue (`error_code`/`msg`,
/// `error`/`error_description`) error shapes are accepted.
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        return (None, (!trimmed.is_empty()).then(|| trimmed.to_string()));
    };

    let text = |key: &str| -> Option<String> {
        match value.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    };

    let code = text("error_code").or_else(|| text("code")).or_else(|| text("error"));
    let message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"));

    (code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> Backend {
        Backend::new(&BackendConfig::new("https://demo.supabase.co/", "anon")).unwrap()
    }

    #[test]
    fn test_public_object_url() {
        let backend = backend();
        assert_eq!(
            backend.public_object_url("images", "/exercises/squat/1.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/images/exercises/squat/1.jpg"
        );
    }

    #[test]
    fn test_user_id_requires_session() {
        let backend = backend();
        assert!(matches!(backend.user_id(), Err(StorageError::NotAuthenticated)));
    }

    #[test]
    fn test_parse_postgrest_error() {
        let (code, message) =
            parse_error_body(r#"{"code":"23505","message":"duplicate key value","details":null}"#);
        assert_eq!(code.as_deref(), Some("23505"));
        assert_eq!(message.as_deref(), Some("duplicate key value"));
    }

    #[test]
    fn test_parse_gotrue_error() {
        let (code, message) =
            parse_error_body(r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#);
        assert_eq!(code.as_deref(), Some("email_not_confirmed"));
        assert_eq!(message.as_deref(), Some("Email not confirmed"));

        let (code, message) = parse_error_body(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(code.as_deref(), Some("invalid_grant"));
        assert_eq!(message.as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn test_parse_plain_text_error() {
        assert_eq!(parse_error_body("  gateway timeout "), (None, Some("gateway timeout".to_string())));
        assert_eq!(parse_error_body(""), (None, None));
    }
}
