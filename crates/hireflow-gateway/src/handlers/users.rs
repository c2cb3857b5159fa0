//! Sign-up, sign-in and the current user.
//!
//! Credentials go to the identity provider; the gateway only keeps a user
//! record keyed by the derived user ID, created on first contact.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use hireflow_auth::{AuthSession, Credentials, IdentityProvider, JwtValidator};
use hireflow_core::{IdentityId, UserId};
use hireflow_store::{Store, User};

use super::{created, ok};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request to register.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpBody {
    /// Email address.
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    /// Optional display name.
    #[serde(default)]
    #[validate(length(max = 100))]
    pub display_name: Option<String>,
}

/// Request to sign in.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInBody {
    /// Email address.
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "must not be empty"))]
    pub password: String,
}

/// Tokens issued by the identity provider.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// JWT access token.
    pub access_token: String,
    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of sign-up or sign-in.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The user record.
    pub user: User,
    /// Tokens; absent when the account awaits email confirmation.
    pub session: Option<SessionResponse>,
}

impl AuthResponse {
    fn new(user: User, session: AuthSession) -> Self {
        let session = session.access_token.map(|access_token| SessionResponse {
            access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        });
        Self { user, session }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account.
///
/// # Errors
///
/// Returns 400 if validation fails or the provider rejects the sign-up.
pub async fn sign_up<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    ValidJson(body): ValidJson<SignUpBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let credentials = Credentials {
        email: body.email.trim().to_string(),
        password: body.password,
    };
    let session = state.identity.sign_up(&credentials).await?;

    let mut user = ensure_user(
        state.services.store.as_ref(),
        session.user.identity_id,
        session.user.email.as_deref().unwrap_or(&credentials.email),
    )?;
    if let Some(name) = body.display_name.filter(|n| !n.trim().is_empty()) {
        user.display_name = Some(name.trim().to_string());
        state.services.store.put_user(&user)?;
    }

    tracing::info!(user_id = %user.user_id, "User signed up");
    Ok(created(AuthResponse::new(user, session)))
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns 401 for bad credentials.
pub async fn sign_in<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    ValidJson(body): ValidJson<SignInBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let credentials = Credentials {
        email: body.email.trim().to_string(),
        password: body.password,
    };
    let session = state.identity.sign_in(&credentials).await?;

    let mut user = ensure_user(
        state.services.store.as_ref(),
        session.user.identity_id,
        session.user.email.as_deref().unwrap_or(&credentials.email),
    )?;
    user.last_login_at = Some(Utc::now());
    state.services.store.put_user(&user)?;

    tracing::info!(user_id = %user.user_id, "User signed in");
    Ok(ok(AuthResponse::new(user, session)))
}

/// Get the authenticated user's record.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn me<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let record = ensure_user(
        state.services.store.as_ref(),
        user.identity_id,
        user.email.as_deref().unwrap_or_default(),
    )?;
    Ok(ok(record))
}

/// Load the user record for `identity_id`, creating it if needed.
fn ensure_user(store: &dyn Store, identity_id: IdentityId, email: &str) -> Result<User, ApiError> {
    let user_id = UserId::from_identity(&identity_id);
    if let Some(user) = store.get_user(&user_id)? {
        return Ok(user);
    }

    let user = User {
        user_id,
        identity_id,
        email: email.to_string(),
        display_name: None,
        created_at: Utc::now(),
        last_login_at: None,
    };
    store.put_user(&user)?;
    tracing::info!(user_id = %user_id, "Created user record");
    Ok(user)
}
