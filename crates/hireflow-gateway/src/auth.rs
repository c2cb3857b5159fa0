//! Authentication extractor.
//!
//! [`AuthUser`] validates the `Authorization: Bearer <token>` header and
//! derives the internal user ID from the token's identity.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use hireflow_auth::{IdentityProvider, JwtValidator, ValidatedClaims};
use hireflow_core::{IdentityId, UserId};

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated user extracted from a JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Identity-provider user ID.
    pub identity_id: IdentityId,
    /// Email address from the token, when present.
    pub email: Option<String>,
    /// Internal user ID derived from `identity_id`.
    pub user_id: UserId,
}

impl AuthUser {
    /// Create an `AuthUser` from validated claims.
    #[must_use]
    pub fn from_claims(claims: &ValidatedClaims) -> Self {
        Self {
            identity_id: claims.identity_id,
            email: claims.email.clone(),
            user_id: UserId::from_identity(&claims.identity_id),
        }
    }
}

#[async_trait]
impl<P, V> FromRequestParts<Arc<GatewayState<P, V>>> for AuthUser
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<P, V>>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(ApiError::missing_token)?;

        let claims = state.jwt_validator.validate(token).await?;

        Ok(Self::from_claims(&claims))
    }
}
