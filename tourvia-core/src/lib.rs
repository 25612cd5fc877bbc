pub mod identity;
pub mod notify;
pub mod payment;

use tourvia_shared::MoneyError;

/// The error taxonomy every service speaks. Only `ExternalDependency`
/// raised by the notification path is ever swallowed (after logging);
/// everything else surfaces to the caller, who refreshes and decides.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("permission denied: {0}")]
    Permission(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("external dependency failed: {0}")]
    ExternalDependency(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MoneyError> for CoreError {
    fn from(err: MoneyError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
