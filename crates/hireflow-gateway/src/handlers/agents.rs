//! Agent management endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use validator::Validate;

use hireflow_agent::{AgentType, CreateAgentRequest, UpdateAgentRequest};
use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_core::{parse_id, AgentId};

use super::{created, ok};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::GatewayState;

// =============================================================================
// Request Types
// =============================================================================

/// Request to create an agent.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAgentBody {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: String,
    /// Visibility; private when omitted.
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    /// Persona instructions.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Tone of voice.
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tone: Option<String>,
    /// Whether the agent keeps several threads per user.
    #[serde(default)]
    pub enable_threads: Option<bool>,
}

impl From<CreateAgentBody> for CreateAgentRequest {
    fn from(body: CreateAgentBody) -> Self {
        Self {
            name: body.name,
            agent_type: body.agent_type,
            system_prompt: body.system_prompt,
            tone: body.tone,
            enable_threads: body.enable_threads,
        }
    }
}

/// Partial update of an agent.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAgentBody {
    /// New display name.
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub name: Option<String>,
    /// New visibility.
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    /// New persona instructions.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// New tone.
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tone: Option<String>,
    /// New threading setting.
    #[serde(default)]
    pub enable_threads: Option<bool>,
}

impl From<UpdateAgentBody> for UpdateAgentRequest {
    fn from(body: UpdateAgentBody) -> Self {
        Self {
            name: body.name,
            agent_type: body.agent_type,
            system_prompt: body.system_prompt,
            tone: body.tone,
            enable_threads: body.enable_threads,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List the agents the user can chat with.
///
/// The user's default agent is created on first listing.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn list_agents<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agents = state.services.agents.list_agents(&user.user_id).await?;
    Ok(ok(agents))
}

/// Create a new agent.
///
/// # Errors
///
/// Returns 400 if validation fails.
pub async fn create_agent<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    ValidJson(body): ValidJson<CreateAgentBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent = state
        .services
        .agents
        .create_agent(&user.user_id, body.into())
        .await?;

    Ok(created(agent))
}

/// Get a single agent.
///
/// # Errors
///
/// Returns 404 if the agent doesn't exist and 403 if it is another user's
/// private agent.
pub async fn get_agent<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;
    let agent = state
        .services
        .agents
        .get_agent(&user.user_id, &agent_id)
        .await?;

    Ok(ok(agent))
}

/// Update an agent. Owner only.
///
/// # Errors
///
/// Returns 403 for non-owners and 409 for archived agents.
pub async fn update_agent<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
    ValidJson(body): ValidJson<UpdateAgentBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;
    let agent = state
        .services
        .agents
        .update_agent(&user.user_id, &agent_id, body.into())
        .await?;

    Ok(ok(agent))
}

/// Archive an agent. Owner only.
///
/// # Errors
///
/// Returns 403 for non-owners and 409 for the default agent.
pub async fn archive_agent<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;
    let agent = state
        .services
        .agents
        .archive_agent(&user.user_id, &agent_id)
        .await?;

    Ok(ok(agent))
}
