use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::Backend;
use super::session_store::SessionStore;
use crate::error::{Result, StorageError};

/// Refresh a little before the token actually runs out
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in));

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RedirectFragment {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// Auto-confirmed account, already signed in
    SignedIn(AuthSession),
    /// A confirmation link was mailed; sign in after following it
    ConfirmationRequired(AuthUser),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Apple => "apple",
        }
    }
}

/// Email/password, anonymous and federated sign-in against the auth endpoints.
///
/// Every successful sign-in installs the new session on the `Backend`, so
/// subsequent table queries run as that user.
pub struct Auth<'a> {
    backend: &'a Backend,
}

impl<'a> Auth<'a> {
    pub(crate) fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self
            .backend
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: serde_json::Value = Backend::check(response).await?.json().await?;

        if body.get("access_token").is_some() {
            let session = serde_json::from_value::<TokenResponse>(body)?.into_session(Utc::now());
            self.install(&session);
            return Ok(SignUpOutcome::SignedIn(session));
        }

        let user = serde_json::from_value::<AuthUser>(body)?;
        info!("Sign-up for {} awaits email confirmation", email);
        Ok(SignUpOutcome::ConfirmationRequired(user))
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn sign_in_anonymously(&self) -> Result<AuthSession> {
        let response = self
            .backend
            .request(Method::POST, "/auth/v1/signup")
            .json(&json!({ "data": {} }))
            .send()
            .await?;
        let token: TokenResponse = Backend::check(response).await?.json().await?;

        let session = token.into_session(Utc::now());
        self.install(&session);
        Ok(session)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<AuthSession> {
        let response = self
            .backend
            .anon_request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        let token: TokenResponse = Backend::check(response).await?.json().await?;

        let session = token.into_session(Utc::now());
        self.install(&session);
        Ok(session)
    }

    /// URL the user opens in a browser to sign in with a federated provider
    pub fn authorize_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> Result<String> {
        let mut params = vec![("provider", provider.as_str())];
        if let Some(redirect_to) = redirect_to {
            params.push(("redirect_to", redirect_to));
        }
        if provider == OAuthProvider::Google {
            params.push(("prompt", "select_account"));
        }

        let url = Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.backend.base_url()),
            &params,
        )
        .map_err(|e| StorageError::Unauthorized(format!("Invalid authorize URL: {}", e)))?;

        Ok(url.into())
    }

    /// Complete a federated sign-in from the URL the provider redirected to
    pub async fn session_from_redirect(&self, redirect_url: &str) -> Result<AuthSession> {
        let url = Url::parse(redirect_url)
            .map_err(|e| StorageError::Unauthorized(format!("Malformed redirect URL: {}", e)))?;
        let fragment = url
            .fragment()
            .ok_or_else(|| StorageError::Unauthorized("Redirect URL carries no tokens".to_string()))?;
        let tokens: RedirectFragment = serde_urlencoded::from_str(fragment)
            .map_err(|e| StorageError::Unauthorized(format!("Malformed redirect tokens: {}", e)))?;

        let response = self
            .backend
            .request_with_token(Method::GET, "/auth/v1/user", &tokens.access_token)
            .send()
            .await?;
        let user: AuthUser = Backend::check(response).await?.json().await?;

        let session = TokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            expires_at: tokens.expires_at,
            user,
        }
        .into_session(Utc::now());

        self.install(&session);
        Ok(session)
    }

    /// Revoke the session server-side and forget it locally.
    ///
    /// An already-expired token still signs out locally.
    pub async fn sign_out(&self) -> Result<()> {
        if self.backend.session().is_some() {
            let response = self
                .backend
                .request(Method::POST, "/auth/v1/logout")
                .send()
                .await?;

            match Backend::check(response).await {
                Ok(_) | Err(StorageError::Unauthorized(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.backend.set_session(None);
        Ok(())
    }

    /// Restore a persisted session on launch, refreshing it when expired.
    ///
    /// A session whose refresh is rejected is discarded.
    pub async fn restore(
        &self,
        store: &dyn SessionStore,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthSession>> {
        let Some(saved) = store.load().await? else {
            return Ok(None);
        };

        if !saved.is_expired(now) {
            self.install(&saved);
            return Ok(Some(saved));
        }

        info!("Stored session expired, refreshing");
        match self.refresh(&saved.refresh_token).await {
            Ok(session) => {
                store.save(&session).await?;
                Ok(Some(session))
            }
            Err(StorageError::Unauthorized(msg)) | Err(StorageError::Api { message: msg, .. }) => {
                warn!("Discarding stored session: {}", msg);
                store.clear().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn install(&self, session: &AuthSession) {
        info!("Signed in as {}", session.user.id);
        self.backend.set_session(Some(session.clone()));
    }
}
