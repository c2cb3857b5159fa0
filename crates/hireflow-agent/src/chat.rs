//! One turn of a tool-augmented conversation.
//!
//! ```text
//! ChatRequest ──▶ access checks ──▶ system prompt + history + user message
//!                                              │
//!                    ┌─────────────────────────┘
//!                    ▼
//!              ChatModel::complete ◀──── tool results
//!                    │                        ▲
//!                    ├── tool calls ──▶ ToolSet
//!                    ▼
//!               reply text ──▶ persist (threaded, not ephemeral)
//! ```
//!
//! Threaded turns register with the [`InterruptRegistry`] and race the loop
//! against the interrupt signal.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use hireflow_core::{AgentId, ConversationId, MessageId, UserId};
use hireflow_rag::RetrieveContext;
use hireflow_store::{
    AgentStatus, ChatMessage, Conversation, MemoryMode, MessageRole, MessageStatus, Store,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::actions::{ActionStore, AgentAction};
use crate::error::{AgentError, Result};
use crate::interrupt::InterruptRegistry;
use crate::llm::{ChatModel, CompletionRequest, Message};
use crate::prompt::{build_system_prompt, temperature_for_tone, trim_history};
use crate::service::{accessible_agent, owned_conversation};
use crate::tools::{ProposeActionTool, RetrieveContextTool, ToolSet};
use crate::types::{ChatConfig, ChatReply, ChatRequest};

/// Longest title derived from a first message, in characters.
const TITLE_LEN: usize = 60;

/// Progress of a turn, for streaming clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The turn passed its checks and is running.
    Started {
        /// Conversation continued, if any.
        thread_id: Option<ConversationId>,
        /// ID the assistant reply will carry.
        message_id: MessageId,
    },
    /// The model called a tool.
    ToolCall {
        /// Tool name.
        name: String,
        /// Arguments passed.
        arguments: Value,
    },
    /// The model proposed an action.
    ActionProposed {
        /// The pending action.
        action: AgentAction,
    },
    /// The final reply.
    Message {
        /// Assistant message ID.
        message_id: MessageId,
        /// Reply text.
        content: String,
    },
    /// The turn was interrupted.
    Interrupted {
        /// Assistant message ID.
        message_id: MessageId,
    },
}

/// Use case: run one chat turn with an agent.
pub struct ChatWithAgent {
    store: Arc<dyn Store>,
    model: Arc<dyn ChatModel>,
    retrieve: Arc<RetrieveContext>,
    actions: Arc<dyn ActionStore>,
    interrupts: InterruptRegistry,
    config: ChatConfig,
}

impl ChatWithAgent {
    /// Create the use case.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        model: Arc<dyn ChatModel>,
        retrieve: Arc<RetrieveContext>,
        actions: Arc<dyn ActionStore>,
        interrupts: InterruptRegistry,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            model,
            retrieve,
            actions,
            interrupts,
            config,
        }
    }

    /// Run a turn, publishing progress to `events` when given.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank message.
    /// - `AgentNotFound`, `AgentForbidden` or `AgentArchived` for an agent
    ///   that is missing, private to someone else or archived.
    /// - `ThreadsDisabled`, `ConversationNotFound`, `ConversationForbidden`
    ///   or `ConversationAgentMismatch` for a bad `thread_id`.
    /// - `Model` and storage errors from the loop itself; nothing is
    ///   persisted then.
    pub async fn execute(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        request: ChatRequest,
        events: Option<mpsc::Sender<ChatEvent>>,
    ) -> Result<ChatReply> {
        let text = request.message.trim();
        if text.is_empty() {
            return Err(AgentError::InvalidInput("message must not be empty".to_string()));
        }

        let agent = accessible_agent(self.store.as_ref(), user_id, agent_id)?;
        if agent.status == AgentStatus::Archived {
            return Err(AgentError::AgentArchived(*agent_id));
        }

        let conversation = match request.thread_id {
            Some(thread_id) => {
                if !agent.configuration.enable_threads {
                    return Err(AgentError::ThreadsDisabled(*agent_id));
                }
                Some(owned_conversation(
                    self.store.as_ref(),
                    user_id,
                    agent_id,
                    &thread_id,
                )?)
            }
            None => None,
        };
        let thread_id = conversation.as_ref().map(|c| c.conversation_id);
        let message_id = MessageId::generate();
        let asked_at = Utc::now();

        let mut messages = vec![Message::system(build_system_prompt(
            &agent,
            conversation.is_some(),
        ))];
        if let Some(c) = &conversation {
            if c.context_policy.memory != MemoryMode::Off {
                let history = self.store.list_messages(&c.conversation_id)?;
                messages.extend(trim_history(&history, c.context_policy.max_tokens));
            }
        }
        messages.push(Message::user(text));

        let mut tools =
            ToolSet::new().with(RetrieveContextTool::new(Arc::clone(&self.retrieve), *user_id));
        if let Some(id) = thread_id {
            tools = tools.with(ProposeActionTool::new(
                Arc::clone(&self.actions),
                id,
                message_id,
                events.clone(),
            ));
        }

        tracing::debug!(
            agent_id = %agent_id,
            user_id = %user_id,
            thread_id = ?thread_id,
            history = messages.len() - 2,
            "Starting chat turn"
        );
        emit(
            events.as_ref(),
            ChatEvent::Started {
                thread_id,
                message_id,
            },
        )
        .await;

        let request = CompletionRequest {
            messages,
            tools: tools.specs(),
            temperature: temperature_for_tone(&agent.configuration.tone),
        };
        let reply = match thread_id {
            Some(id) => {
                let mut handle = self.interrupts.register(id);
                tokio::select! {
                    biased;
                    () = handle.interrupted() => None,
                    result = self.run_loop(request, &tools, events.as_ref()) => Some(result?),
                }
            }
            None => Some(self.run_loop(request, &tools, events.as_ref()).await?),
        };

        let (content, status) = match reply {
            Some(content) => (content, MessageStatus::Completed),
            None => {
                tracing::info!(thread_id = ?thread_id, message_id = %message_id, "Chat turn interrupted");
                (String::new(), MessageStatus::Interrupted)
            }
        };

        if let Some(conversation) = conversation {
            if conversation.context_policy.memory != MemoryMode::Ephemeral {
                self.persist(conversation, text, asked_at, message_id, &content, status)?;
            }
        }

        let event = match status {
            MessageStatus::Completed => ChatEvent::Message {
                message_id,
                content: content.clone(),
            },
            MessageStatus::Interrupted => ChatEvent::Interrupted { message_id },
        };
        emit(events.as_ref(), event).await;

        Ok(ChatReply {
            thread_id,
            message_id,
            reply: content,
            status,
        })
    }

    /// Call the model until it stops asking for tools or the round limit
    /// is hit, then return the final text.
    async fn run_loop(
        &self,
        mut request: CompletionRequest,
        tools: &ToolSet,
        events: Option<&mpsc::Sender<ChatEvent>>,
    ) -> Result<String> {
        for round in 0..self.config.max_tool_rounds {
            let completion = self.model.complete(&request).await?;
            if completion.tool_calls.is_empty() {
                return Ok(completion.content);
            }

            tracing::debug!(round, calls = completion.tool_calls.len(), "Model requested tools");
            let calls = completion.tool_calls.clone();
            request
                .messages
                .push(Message::assistant_tool_calls(completion.content, completion.tool_calls));
            for call in &calls {
                emit(
                    events,
                    ChatEvent::ToolCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                )
                .await;
                request.messages.push(tools.respond(call).await?);
            }
        }

        // Out of tool rounds: force a text answer
        request.tools.clear();
        Ok(self.model.complete(&request).await?.content)
    }

    fn persist(
        &self,
        mut conversation: Conversation,
        text: &str,
        asked_at: chrono::DateTime<Utc>,
        message_id: MessageId,
        reply: &str,
        status: MessageStatus,
    ) -> Result<()> {
        let conversation_id = conversation.conversation_id;
        self.store.put_message(&ChatMessage {
            message_id: MessageId::generate(),
            conversation_id,
            role: MessageRole::User,
            content: text.to_string(),
            status: MessageStatus::Completed,
            created_at: asked_at,
        })?;

        // Message order follows created_at, so the reply must sort after the question
        let replied_at = Utc::now().max(asked_at + TimeDelta::microseconds(1));
        self.store.put_message(&ChatMessage {
            message_id,
            conversation_id,
            role: MessageRole::Assistant,
            content: reply.to_string(),
            status,
            created_at: replied_at,
        })?;

        if conversation.title.is_none() {
            conversation.title = Some(title_from(text));
        }
        conversation.updated_at = replied_at;
        self.store.put_conversation(&conversation)?;

        tracing::debug!(conversation_id = %conversation_id, "Persisted chat turn");
        Ok(())
    }
}

fn title_from(text: &str) -> String {
    let line = text.lines().next().unwrap_or(text).trim();
    if line.chars().count() <= TITLE_LEN {
        return line.to_string();
    }
    let cut: String = line.chars().take(TITLE_LEN).collect();
    format!("{}…", cut.trim_end())
}

async fn emit(events: Option<&mpsc::Sender<ChatEvent>>, event: ChatEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
