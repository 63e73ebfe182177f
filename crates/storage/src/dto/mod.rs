pub mod auth;
pub mod measurement;
pub mod profile;
pub mod routine;
pub mod workout;

// Validation helper
pub(crate) fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        Err(validator::ValidationError::new("blank"))
    } else {
        Ok(())
    }
}
