//! Error types for agents, conversations and actions.
//!
//! Every variant maps onto one HTTP status through
//! [`AgentError::http_status_code`].

use hireflow_core::{ActionId, AgentId, ConversationId, UserId};
use thiserror::Error;

use crate::actions::ActionStatus;

/// A result type using `AgentError`.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that can occur in agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The requested agent was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// The requested conversation was not found.
    #[error("conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// The conversation exists but belongs to a different agent.
    #[error("conversation {conversation_id} does not belong to agent {agent_id}")]
    ConversationAgentMismatch {
        /// The conversation addressed.
        conversation_id: ConversationId,
        /// The agent addressed.
        agent_id: AgentId,
    },

    /// The requested action was not found or has expired.
    #[error("action not found: {0}")]
    ActionNotFound(ActionId),

    /// The user may not use this agent.
    #[error("user {user_id} may not access agent {agent_id}")]
    AgentForbidden {
        /// The user making the request.
        user_id: UserId,
        /// The agent being accessed.
        agent_id: AgentId,
    },

    /// The user is not the owner of the conversation.
    #[error("user {user_id} is not the owner of conversation {conversation_id}")]
    ConversationForbidden {
        /// The user making the request.
        user_id: UserId,
        /// The conversation being accessed.
        conversation_id: ConversationId,
    },

    /// The agent does not support threads.
    #[error("threads are disabled for agent {0}")]
    ThreadsDisabled(AgentId),

    /// The agent is archived and no longer chats.
    #[error("agent {0} is archived")]
    AgentArchived(AgentId),

    /// The default agent cannot be archived.
    #[error("agent {0} is the default agent and cannot be archived")]
    DefaultAgent(AgentId),

    /// The action is not awaiting a decision.
    #[error("action {action_id} is already {status}")]
    ActionConflict {
        /// The action addressed.
        action_id: ActionId,
        /// Its current status.
        status: ActionStatus,
    },

    /// The request is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The chat model provider failed.
    #[error("model error: {0}")]
    Model(String),

    /// A tool call failed.
    #[error("tool error: {0}")]
    Tool(String),

    /// Retrieval failed.
    #[error("retrieval error: {0}")]
    Rag(#[from] hireflow_rag::RagError),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] hireflow_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AgentNotFound(_)
            | Self::ConversationNotFound(_)
            | Self::ConversationAgentMismatch { .. }
            | Self::ActionNotFound(_) => 404,
            Self::AgentForbidden { .. }
            | Self::ConversationForbidden { .. }
            | Self::ThreadsDisabled(_) => 403,
            Self::AgentArchived(_) | Self::DefaultAgent(_) | Self::ActionConflict { .. } => 409,
            Self::InvalidInput(_) => 400,
            Self::Rag(e) => e.http_status_code(),
            Self::Model(_) | Self::Tool(_) | Self::Store(_) | Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let agent_id = AgentId::generate();
        let conversation_id = ConversationId::generate();
        let user_id = UserId::from_bytes([2u8; 32]);

        assert_eq!(AgentError::AgentNotFound(agent_id).http_status_code(), 404);
        assert_eq!(
            AgentError::ConversationAgentMismatch {
                conversation_id,
                agent_id
            }
            .http_status_code(),
            404
        );
        assert_eq!(
            AgentError::ConversationForbidden {
                user_id,
                conversation_id
            }
            .http_status_code(),
            403
        );
        assert_eq!(AgentError::ThreadsDisabled(agent_id).http_status_code(), 403);
        assert_eq!(AgentError::AgentArchived(agent_id).http_status_code(), 409);
        assert_eq!(
            AgentError::ActionConflict {
                action_id: ActionId::generate(),
                status: ActionStatus::Completed
            }
            .http_status_code(),
            409
        );
        assert_eq!(AgentError::Model("down".into()).http_status_code(), 500);
    }

    #[test]
    fn conflict_names_current_status() {
        let err = AgentError::ActionConflict {
            action_id: ActionId::generate(),
            status: ActionStatus::Cancelled,
        };
        assert!(err.to_string().ends_with("is already cancelled"));
    }
}
