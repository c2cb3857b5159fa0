//! API error types and responses.
//!
//! Every failure leaves the gateway as
//! `{"success": false, "code": "...", "message": "...", "errors": [...]}`.
//! Upstream and storage failures are logged here and answered with a
//! generic message.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use hireflow_agent::AgentError;
use hireflow_auth::AuthError;
use hireflow_core::CoreError;
use hireflow_profile::ProfileError;
use hireflow_rag::RagError;

/// A validation failure on one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// User does not have permission to access this resource.
    #[error("{0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("{0}")]
    Conflict(String),

    /// Too many requests.
    #[error("rate limited")]
    RateLimited,

    /// Invalid request body or parameters.
    #[error("{0}")]
    BadRequest(String),

    /// One or more fields failed validation.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// The request body exceeds the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Internal server error. Holds a message safe to show clients.
    #[error("{0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation_error",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Shorthand for a missing or malformed bearer token.
    #[must_use]
    pub fn missing_token() -> Self {
        Self::Unauthorized("missing or invalid bearer token".to_string())
    }

    fn internal(public: &str, err: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{public}");
        Self::Internal(public.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();
        let errors = match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            code,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.http_status_code() {
            401 => Self::Unauthorized(err.to_string()),
            400 => Self::BadRequest(err.to_string()),
            429 => Self::RateLimited,
            _ => Self::internal("authentication service error", &err),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::DocumentNotFound(id) => Self::NotFound(format!("document {id}")),
            RagError::NotOwner { document_id, .. } => {
                Self::Forbidden(format!("document {document_id} belongs to another user"))
            }
            RagError::InvalidInput(msg) => Self::BadRequest(msg),
            RagError::Embedding(_) => Self::internal("embedding provider error", &err),
            RagError::Extraction(_) | RagError::Blob(_) => {
                Self::internal("document processing error", &err)
            }
            RagError::Store(_) => Self::internal("storage error", &err),
            RagError::Internal(_) => Self::internal("internal error", &err),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::AgentNotFound(id) => Self::NotFound(format!("agent {id}")),
            AgentError::ConversationNotFound(id) => Self::NotFound(format!("thread {id}")),
            AgentError::ConversationAgentMismatch {
                conversation_id, ..
            } => Self::NotFound(format!("thread {conversation_id}")),
            AgentError::ActionNotFound(id) => Self::NotFound(format!("action {id}")),
            AgentError::AgentForbidden { agent_id, .. } => {
                Self::Forbidden(format!("agent {agent_id} is not accessible"))
            }
            AgentError::ConversationForbidden {
                conversation_id, ..
            } => Self::Forbidden(format!("thread {conversation_id} belongs to another user")),
            AgentError::ThreadsDisabled(_) => Self::Forbidden(err.to_string()),
            AgentError::AgentArchived(_)
            | AgentError::DefaultAgent(_)
            | AgentError::ActionConflict { .. } => Self::Conflict(err.to_string()),
            AgentError::InvalidInput(msg) => Self::BadRequest(msg),
            AgentError::Rag(rag_err) => Self::from(rag_err),
            AgentError::Model(_) => Self::internal("model provider error", &err),
            AgentError::Tool(_) => Self::internal("tool error", &err),
            AgentError::Store(_) => Self::internal("storage error", &err),
            AgentError::Internal(_) => Self::internal("internal error", &err),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::RoleNotFound(id) => Self::NotFound(format!("role {id}")),
            ProfileError::InvalidInput(msg) => Self::BadRequest(msg),
            ProfileError::Store(_) => Self::internal("storage error", &err),
        }
    }
}

impl From<hireflow_store::StoreError> for ApiError {
    fn from(err: hireflow_store::StoreError) -> Self {
        match err {
            hireflow_store::StoreError::NotFound { kind, id } => {
                Self::NotFound(format!("{kind} {id}"))
            }
            _ => Self::internal("storage error", &err),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidId { .. } => Self::BadRequest(err.to_string()),
            CoreError::Internal(_) => Self::internal("internal error", &err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("request body too large".to_string())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map_or_else(|| e.code.to_string(), ToString::to_string),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        Self::Validation(fields)
    }
}
