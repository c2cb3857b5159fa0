//! Error types for profile operations.

use hireflow_core::RoleId;
use thiserror::Error;

/// A result type using `ProfileError`.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Errors that can occur in profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The role is not part of the profile.
    #[error("role not found: {0}")]
    RoleNotFound(RoleId),

    /// The request is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] hireflow_store::StoreError),
}

impl ProfileError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::RoleNotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::Store(_) => 500,
        }
    }
}
