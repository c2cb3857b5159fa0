//! Candidate profile endpoints.
//!
//! Every response carries the profile together with its completeness.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Serialize;

use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_core::{parse_id, RoleId};
use hireflow_profile::{ProfileView, Role, RoleInput, RolePatch, UpdateProfileRequest};

use super::{created, ok};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::GatewayState;

/// A role together with the updated profile.
#[derive(Debug, Serialize)]
pub struct RoleResponse {
    /// The role added or changed.
    pub role: Role,
    /// The profile after the change.
    pub profile: ProfileView,
}

/// Get the user's profile.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn get_profile<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    Ok(ok(state.services.profiles.get_profile(&user.user_id)?))
}

/// Patch the user's profile.
///
/// # Errors
///
/// Returns 400 for a malformed body.
pub async fn update_profile<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    JsonBody(body): JsonBody<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    Ok(ok(state
        .services
        .profiles
        .update_profile(&user.user_id, body)?))
}

/// Add a role to the work history.
///
/// # Errors
///
/// Returns 400 if the title or company is blank.
pub async fn add_role<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    JsonBody(body): JsonBody<RoleInput>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (role, profile) = state.services.profiles.add_role(&user.user_id, body)?;
    Ok(created(RoleResponse { role, profile }))
}

/// Edit a role.
///
/// # Errors
///
/// Returns 404 if the role doesn't exist.
pub async fn update_role<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(role_id): Path<String>,
    JsonBody(body): JsonBody<RolePatch>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let role_id: RoleId = parse_id("role_id", &role_id)?;
    let (role, profile) = state
        .services
        .profiles
        .update_role(&user.user_id, &role_id, body)?;

    Ok(ok(RoleResponse { role, profile }))
}

/// Remove a role.
///
/// # Errors
///
/// Returns 404 if the role doesn't exist.
pub async fn delete_role<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(role_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let role_id: RoleId = parse_id("role_id", &role_id)?;
    let profile = state
        .services
        .profiles
        .delete_role(&user.user_id, &role_id)?;

    Ok(ok(profile))
}
