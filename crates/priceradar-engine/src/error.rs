use thiserror::Error;

/// Failure reported by an [`ObservationStore`](crate::ObservationStore)
/// implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store {0} not found")]
    UnknownStore(i64),
    #[error("corrupt stored record: {0}")]
    Corrupt(String),
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Error taxonomy for engine operations.
///
/// `Validation` and `Forbidden` reject the caller's input; `NotFound` marks a
/// missing referenced record (an empty query result is NOT a `NotFound`);
/// `Storage` wraps collaborator failures and is never retried here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl EngineError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        EngineError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        EngineError::NotFound(message.into())
    }

    /// The offending field for validation errors, if any.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            EngineError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Field-level coordinate checks shared by queries and submissions.
pub(crate) fn validate_point(latitude: f64, longitude: f64) -> Result<(), EngineError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(EngineError::validation(
            "latitude",
            "latitude must be between -90 and 90",
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(EngineError::validation(
            "longitude",
            "longitude must be between -180 and 180",
        ));
    }
    Ok(())
}
