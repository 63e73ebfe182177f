use storage::error::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A client-side rule refused the operation before anything was sent
    #[error("{0}")]
    Rejected(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Email not confirmed: follow the link sent to {0}")]
    EmailNotConfirmed(String),
}

impl TrackerError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// True for failures reaching or answered by the backend
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
