//! Chat endpoints, blocking and streamed.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use validator::Validate;

use hireflow_agent::{ChatEvent, ChatRequest};
use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_core::{parse_id, AgentId, ConversationId};

use super::{ok, sse_event, sse_stream};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::GatewayState;

const EVENT_BUFFER: usize = 32;

/// One user message.
#[derive(Debug, Deserialize, Validate)]
pub struct ChatBody {
    /// Message text.
    #[validate(length(min = 1, max = 20000, message = "must be 1-20000 characters"))]
    pub message: String,
    /// Thread to continue; omitted for a one-off exchange.
    #[serde(default)]
    pub thread_id: Option<ConversationId>,
}

impl From<ChatBody> for ChatRequest {
    fn from(body: ChatBody) -> Self {
        Self {
            message: body.message,
            thread_id: body.thread_id,
        }
    }
}

/// Send a message and wait for the full reply.
///
/// # Errors
///
/// Returns 400 for a blank message, 404/403/409 for an unusable agent or
/// thread, and 500 if the model fails.
pub async fn chat<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
    ValidJson(body): ValidJson<ChatBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;
    let reply = state
        .services
        .chat
        .execute(&user.user_id, &agent_id, body.into(), None)
        .await?;

    Ok(ok(reply))
}

/// Send a message and stream the turn as server-sent events.
///
/// Each event's data is a JSON `ChatEvent`. A failure after the stream has
/// started arrives as `{"type": "error", "code", "message"}`.
///
/// # Errors
///
/// Agent and thread access are checked before the stream opens and fail
/// with the usual status codes.
pub async fn chat_stream<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(agent_id): Path<String>,
    ValidJson(body): ValidJson<ChatBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let agent_id: AgentId = parse_id("agent_id", &agent_id)?;

    state
        .services
        .agents
        .get_agent(&user.user_id, &agent_id)
        .await?;
    if let Some(thread_id) = &body.thread_id {
        state
            .services
            .agents
            .get_conversation(&user.user_id, &agent_id, thread_id)
            .await?;
    }

    let (out_tx, out_rx) = mpsc::channel(EVENT_BUFFER);
    let chat = Arc::clone(&state.services.chat);
    let request: ChatRequest = body.into();

    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::channel::<ChatEvent>(EVENT_BUFFER);
        let turn = chat.execute(&user.user_id, &agent_id, request, Some(tx));
        let forward = async {
            while let Some(event) = rx.recv().await {
                if let Some(event) = sse_event(&event) {
                    // the turn keeps running if the client disconnects
                    let _ = out_tx.send(event).await;
                }
            }
        };
        let (result, ()) = tokio::join!(turn, forward);

        if let Err(err) = result {
            let err = ApiError::from(err);
            let payload = json!({
                "type": "error",
                "code": err.code(),
                "message": err.to_string(),
            });
            if let Some(event) = sse_event(&payload) {
                let _ = out_tx.send(event).await;
            }
        }
    });

    Ok(sse_stream(out_rx))
}
