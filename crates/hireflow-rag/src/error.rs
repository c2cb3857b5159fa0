//! Error types for ingestion and retrieval.

use hireflow_core::{DocumentId, UserId};
use thiserror::Error;

/// A result type using `RagError`.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur while ingesting or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// The requested document was not found.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The user is not the owner of the requested document.
    #[error("user {user_id} is not the owner of document {document_id}")]
    NotOwner {
        /// The user making the request.
        user_id: UserId,
        /// The document being accessed.
        document_id: DocumentId,
    },

    /// The request is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The embedding provider failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Text could not be extracted from the file.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Blob storage failed.
    #[error("blob storage error: {0}")]
    Blob(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] hireflow_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::DocumentNotFound(_) => 404,
            Self::NotOwner { .. } => 403,
            Self::InvalidInput(_) => 400,
            Self::Embedding(_)
            | Self::Extraction(_)
            | Self::Blob(_)
            | Self::Store(_)
            | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let document_id = DocumentId::generate();
        let user_id = UserId::from_bytes([2u8; 32]);

        assert_eq!(
            RagError::DocumentNotFound(document_id).http_status_code(),
            404
        );
        assert_eq!(
            RagError::NotOwner {
                user_id,
                document_id
            }
            .http_status_code(),
            403
        );
        assert_eq!(
            RagError::InvalidInput("empty".into()).http_status_code(),
            400
        );
        assert_eq!(
            RagError::Embedding("quota".into()).http_status_code(),
            500
        );
    }
}
