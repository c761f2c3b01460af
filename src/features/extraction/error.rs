use thiserror::Error;

use crate::core::error::AppError;

/// How a failed extraction attempt should be treated by the worker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// Worth retrying: storage or repository trouble, timeouts, converter failures
    #[error("transient extraction failure: {0}")]
    Transient(String),

    /// Retrying cannot help: corrupt or unreadable content
    #[error("terminal extraction failure: {0}")]
    Terminal(String),
}

impl ExtractionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExtractionError::Transient(_))
    }
}

/// Repository and blob store errors are infrastructure trouble
impl From<AppError> for ExtractionError {
    fn from(err: AppError) -> Self {
        ExtractionError::Transient(err.to_string())
    }
}
