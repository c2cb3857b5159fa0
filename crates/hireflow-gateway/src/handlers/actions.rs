//! Action confirmation endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use hireflow_agent::{ActionDecision, ActionEvent, Decided};
use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_core::{parse_id, ActionId};

use super::threads::parse_thread_path;
use super::{ok, sse_event, sse_stream};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::GatewayState;

/// Optional body of a confirmation.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmBody {
    /// Parameters merged over the proposed ones before execution.
    #[serde(default)]
    pub parameters_override: Option<Map<String, Value>>,
}

/// Confirm a proposed action and stream its execution.
///
/// Emits an `executing` event, then `completed` or `failed`, as JSON
/// `ActionEvent`s.
///
/// # Errors
///
/// Returns 404 for an unknown or expired action and 409 if it is no longer
/// awaiting a decision. These are reported before the stream opens.
pub async fn confirm_action<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path((agent_id, thread_id, action_id)): Path<(String, String, String)>,
    body: Option<JsonBody<ConfirmBody>>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (agent_id, thread_id) = parse_thread_path(&agent_id, &thread_id)?;
    let action_id: ActionId = parse_id("action_id", &action_id)?;
    let body = body.map(|JsonBody(b)| b).unwrap_or_default();

    state
        .services
        .agents
        .get_conversation(&user.user_id, &agent_id, &thread_id)
        .await?;

    let decision = ActionDecision::Confirm {
        parameters_override: body.parameters_override,
    };
    let action = match state
        .services
        .actions
        .accept(&user.user_id, &thread_id, &action_id, decision)?
    {
        Decided::Confirmed(action) => action,
        Decided::Cancelled(_) => {
            return Err(ApiError::Internal("unexpected action outcome".to_string()))
        }
    };

    let (out_tx, out_rx) = mpsc::channel(8);
    let actions = Arc::clone(&state.services.actions);

    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::channel::<ActionEvent>(8);
        let run = actions.run(&user.user_id, action, Some(tx));
        let forward = async {
            while let Some(event) = rx.recv().await {
                if let Some(event) = sse_event(&event) {
                    let _ = out_tx.send(event).await;
                }
            }
        };
        tokio::join!(run, forward);
    });

    Ok(sse_stream(out_rx))
}

/// Cancel a proposed action. No events are emitted.
///
/// # Errors
///
/// Returns 404 for an unknown or expired action and 409 if it is no longer
/// awaiting a decision.
pub async fn cancel_action<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path((agent_id, thread_id, action_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let (agent_id, thread_id) = parse_thread_path(&agent_id, &thread_id)?;
    let action_id: ActionId = parse_id("action_id", &action_id)?;

    state
        .services
        .agents
        .get_conversation(&user.user_id, &agent_id, &thread_id)
        .await?;

    let action = state
        .services
        .actions
        .decide(
            &user.user_id,
            &thread_id,
            &action_id,
            ActionDecision::Cancel,
            None,
        )
        .await?;

    Ok(ok(action))
}
