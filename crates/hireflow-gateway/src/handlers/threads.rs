//! Thread (conversation) endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use hireflow_agent::CreateConversationRequest;
use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_core::{parse_id, AgentId, ConversationId, MessageId};

use super::{created, ok, Deleted};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::GatewayState;

/// Request to interrupt a running turn.
#[derive(Debug, Default, Deserialize)]
pub struct InterruptBody {
    /// Assistant message to mark interrupted.
    #[serde(default)]
    pub message_id: Option<MessageId>,
}

/// Result of an interrupt.
#[derive(Debug, Serialize)]
pub struct InterruptResponse {
    /// Thread addressed.
    pub thread_id: ConversationId,
    /// Whether a running turn was stopped.
    pub interrupted: bool,
}

/// Parse the agent and thread segments of a thread path.
pub(crate) fn parse_thread_path(
    agent_id: &str,
    thread_id: &str,
) -> Result<(AgentId, ConversationId), ApiError> {
    Ok((
        parse_id("agent_id", agent_id)?,
        parse_id("thread_id", thread_id)?,
    ))
}

/// List the user's threads with an agent, most recent first.
///
/// # Errors
///
/// Returns 400 for a malformed agent ID.
pub async fn list_threads<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;
    let threads = state
        .services
        .agents
        .list_conversations(&user.user_id, &agent_id)
        .await?;

    Ok(ok(threads))
}

/// Open a thread. Agents without threads return the existing one.
///
/// # Errors
///
/// Returns 409 for an archived agent.
pub async fn create_thread<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
    body: Option<JsonBody<CreateConversationRequest>>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;
    let request = body.map(|JsonBody(b)| b).unwrap_or_default();
    let thread = state
        .services
        .agents
        .create_conversation(&user.user_id, &agent_id, request)
        .await?;

    Ok(created(thread))
}

/// Get one thread.
///
/// # Errors
///
/// Returns 404 if it doesn't exist or belongs to another agent, and 403 if
/// it belongs to another user.
pub async fn get_thread<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path((agent_id, thread_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (agent_id, thread_id) = parse_thread_path(&agent_id, &thread_id)?;
    let thread = state
        .services
        .agents
        .get_conversation(&user.user_id, &agent_id, &thread_id)
        .await?;

    Ok(ok(thread))
}

/// Delete a thread and its messages.
///
/// # Errors
///
/// Same as [`get_thread`].
pub async fn delete_thread<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path((agent_id, thread_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (agent_id, thread_id) = parse_thread_path(&agent_id, &thread_id)?;
    state
        .services
        .agents
        .delete_conversation(&user.user_id, &agent_id, &thread_id)
        .await?;

    Ok(ok(Deleted::new(thread_id)))
}

/// List a thread's messages in order.
///
/// # Errors
///
/// Same as [`get_thread`].
pub async fn list_messages<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path((agent_id, thread_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (agent_id, thread_id) = parse_thread_path(&agent_id, &thread_id)?;
    let messages = state
        .services
        .agents
        .list_messages(&user.user_id, &agent_id, &thread_id)
        .await?;

    Ok(ok(messages))
}

/// Stop the turn running on a thread and mark its message interrupted.
///
/// # Errors
///
/// Same as [`get_thread`].
pub async fn interrupt_thread<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path((agent_id, thread_id)): Path<(String, String)>,
    body: Option<JsonBody<InterruptBody>>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (agent_id, thread_id) = parse_thread_path(&agent_id, &thread_id)?;
    let body = body.map(|JsonBody(b)| b).unwrap_or_default();

    // checks ownership and that the thread belongs to this agent
    state
        .services
        .agents
        .get_conversation(&user.user_id, &agent_id, &thread_id)
        .await?;

    let interrupted = state.services.interrupt.execute(
        &user.user_id,
        &thread_id,
        body.message_id.as_ref(),
    )?;

    tracing::info!(thread_id = %thread_id, interrupted, "Interrupt requested");
    Ok(ok(InterruptResponse {
        thread_id,
        interrupted,
    }))
}
