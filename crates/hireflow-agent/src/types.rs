//! Request and response types for agent operations.

use hireflow_core::{ConversationId, MessageId};
use hireflow_store::{AgentType, ContextPolicy, MessageStatus};
use serde::{Deserialize, Serialize};

/// Longest accepted agent name, in characters.
pub const MAX_AGENT_NAME_LEN: usize = 100;

/// Request to create a new agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    /// Display name.
    pub name: String,
    /// Visibility. Private when omitted.
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    /// Persona instructions. Uses the default persona when omitted.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Tone of voice.
    #[serde(default)]
    pub tone: Option<String>,
    /// Whether the agent keeps several conversations per user.
    #[serde(default)]
    pub enable_threads: Option<bool>,
}

impl CreateAgentRequest {
    /// Create a new request with the given name and default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update of an agent. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgentRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New visibility.
    #[serde(default)]
    pub agent_type: Option<AgentType>,
    /// New persona instructions.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// New tone.
    #[serde(default)]
    pub tone: Option<String>,
    /// New threading setting.
    #[serde(default)]
    pub enable_threads: Option<bool>,
}

/// Request to open a conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    /// Optional title; set from the first message otherwise.
    #[serde(default)]
    pub title: Option<String>,
    /// Memory policy. Defaults apply when omitted.
    #[serde(default)]
    pub context_policy: Option<ContextPolicy>,
}

/// One chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Conversation to continue. Unthreaded turns are not stored.
    #[serde(default)]
    pub thread_id: Option<ConversationId>,
}

impl ChatRequest {
    /// A message outside any conversation.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread_id: None,
        }
    }

    /// A message continuing `thread_id`.
    #[must_use]
    pub fn in_thread(message: impl Into<String>, thread_id: ConversationId) -> Self {
        Self {
            message: message.into(),
            thread_id: Some(thread_id),
        }
    }
}

/// Result of a chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Conversation continued, if any.
    pub thread_id: Option<ConversationId>,
    /// ID of the assistant message.
    pub message_id: MessageId,
    /// Reply text; empty when interrupted.
    pub reply: String,
    /// Whether the reply completed or was interrupted.
    pub status: MessageStatus,
}

/// Tunables for chat turns.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model rounds that may return tool calls before a final tool-less call.
    pub max_tool_rounds: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { max_tool_rounds: 5 }
    }
}
