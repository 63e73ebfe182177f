use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error ({status}): {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    fn api_code(&self) -> Option<&str> {
        match self {
            StorageError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.api_code() == Some("23505")
            || matches!(self, StorageError::ConstraintViolation(_))
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.api_code() == Some("23503")
    }

    /// GoTrue rejects password sign-in for unconfirmed accounts with this message.
    pub fn is_email_not_confirmed(&self) -> bool {
        match self {
            StorageError::Api { code, message, .. } => {
                code.as_deref() == Some("email_not_confirmed")
                    || message.contains("Email not confirmed")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(code: Option<&str>, message: &str) -> StorageError {
        StorageError::Api {
            status: StatusCode::BAD_REQUEST,
            code: code.map(String::from),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_postgres_codes_are_classified() {
        assert!(api(Some("23505"), "duplicate key").is_unique_violation());
        assert!(api(Some("23503"), "fk").is_foreign_key_violation());
        assert!(!api(Some("42P01"), "missing table").is_unique_violation());
        assert!(!StorageError::NotFound.is_foreign_key_violation());
    }

    #[test]
    fn test_email_not_confirmed_matches_code_or_message() {
        assert!(api(Some("email_not_confirmed"), "whatever").is_email_not_confirmed());
        assert!(api(None, "Email not confirmed").is_email_not_confirmed());
        assert!(!api(None, "Invalid login credentials").is_email_not_confirmed());
    }
}
