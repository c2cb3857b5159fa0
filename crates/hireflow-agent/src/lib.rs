//! Conversational agents for hireflow.
//!
//! This crate owns everything between an authenticated user and the chat
//! model:
//!
//! - **Agents and conversations**: [`AgentManager`] / [`AgentService`]
//! - **Chat turns**: [`ChatWithAgent`] runs the tool loop with
//!   `retrieve_context` and `propose_action`
//! - **Actions**: [`ActionService`] applies confirm/cancel decisions to
//!   proposed actions held in an [`ActionStore`]
//! - **Interrupts**: [`Interrupt`] stops a running turn through the shared
//!   [`InterruptRegistry`]
//! - **Providers**: [`ChatModel`] implementations for OpenAI and Gemini

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod actions;
pub mod chat;
pub mod error;
pub mod interrupt;
pub mod llm;
pub mod prompt;
pub mod service;
pub mod tools;
pub mod types;

pub use actions::{
    ActionDecision, ActionEvent, ActionExecutor, ActionService, ActionStatus, ActionStore,
    ActionType, AgentAction, Decided, InMemoryActionStore, LlmActionExecutor,
};
pub use chat::{ChatEvent, ChatWithAgent};
pub use error::{AgentError, Result};
pub use interrupt::{Interrupt, InterruptHandle, InterruptRegistry};
pub use llm::{
    build_chat_model, ChatModel, ChatModelConfig, Completion, CompletionRequest,
    GeminiChatModel, OpenAiChatModel, ProviderKind,
};
pub use service::{AgentManager, AgentService, DEFAULT_AGENT_NAME};
pub use types::{
    ChatConfig, ChatReply, ChatRequest, CreateAgentRequest, CreateConversationRequest,
    UpdateAgentRequest,
};

// Re-export store types that are part of the public API
pub use hireflow_store::{
    Agent, AgentConfiguration, AgentStatus, AgentType, ChatMessage, ContextPolicy, Conversation,
    MemoryMode, MessageStatus,
};

#[cfg(any(test, feature = "test-utils"))]
pub use llm::ScriptedChatModel;
