use alertstore_common::types::AlertState;

/// Errors returned by [`crate::AlertStore`] operations.
///
/// Any error raised inside an atomic scope aborts that scope; nothing an
/// operation wrote before the failure is visible afterwards.
///
/// # Examples
///
/// ```rust
/// use alertstore_storage::error::AlertError;
///
/// let err = AlertError::NotFound { id: 42 };
/// assert!(err.to_string().contains("42"));
/// assert!(!err.is_storage());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The referenced alert rule does not exist (or belongs to another org).
    #[error("Alert: rule {id} not found")]
    NotFound { id: i64 },

    /// The rule is paused; only the pause operation may change its state.
    #[error("Alert: cannot change state of paused rule {id}")]
    InvalidTransition { id: i64 },

    /// The requested state equals the current state.
    #[error("Alert: rule {id} is already in state '{state}'")]
    NoOpTransition { id: i64, state: AlertState },

    /// Malformed command input: bad `for` text, missing org/dashboard/panel,
    /// duplicate panels, empty id list.
    #[error("Alert: validation failed: {0}")]
    Validation(String),

    /// The backing database failed.
    #[error("Alert: storage error: {0}")]
    Storage(#[from] sea_orm::DbErr),

    /// A stored JSON column (settings, eval data) could not be encoded or decoded.
    #[error("Alert: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlertError {
    /// True for failures of the store itself, as opposed to rejected input.
    pub fn is_storage(&self) -> bool {
        matches!(self, AlertError::Storage(_) | AlertError::Json(_))
    }
}

impl From<alertstore_common::duration::ParseDurationError> for AlertError {
    fn from(err: alertstore_common::duration::ParseDurationError) -> Self {
        AlertError::Validation(err.to_string())
    }
}

/// Convenience `Result` alias for alert store operations.
pub type Result<T> = std::result::Result<T, AlertError>;
