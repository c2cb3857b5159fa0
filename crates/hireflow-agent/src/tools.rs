//! Tools the model can call during a turn.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hireflow_core::{ActionId, ConversationId, MessageId, UserId};
use hireflow_rag::{RetrieveContext, DEFAULT_K};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use crate::actions::{ActionStatus, ActionStore, ActionType, AgentAction};
use crate::chat::ChatEvent;
use crate::error::{AgentError, Result};
use crate::llm::{Message, ToolCall, ToolSpec};

/// Upper bound on chunks a single retrieval may return.
pub const MAX_RETRIEVE_K: usize = 20;

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration shown to the model.
    fn spec(&self) -> ToolSpec;

    /// Run the tool with the model-supplied arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the tool fails.
    async fn call(&self, arguments: &Value) -> Result<String>;
}

/// The tools bound for one turn.
#[derive(Default)]
pub struct ToolSet {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool.
    #[must_use]
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    /// Declarations of every tool.
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Run the tool named by `call`.
    ///
    /// # Errors
    ///
    /// Returns `Tool` for an unknown tool, or the tool's own error.
    pub async fn invoke(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.spec().name == call.name)
            .ok_or_else(|| AgentError::Tool(format!("unknown tool: {}", call.name)))?;
        tool.call(&call.arguments).await
    }

    /// Run `call` and wrap the outcome as a tool message.
    ///
    /// Tool errors are reported back to the model rather than failing the
    /// turn, except for storage and retrieval errors which propagate.
    ///
    /// # Errors
    ///
    /// Returns infrastructure errors raised by the tool.
    pub async fn respond(&self, call: &ToolCall) -> Result<Message> {
        match self.invoke(call).await {
            Ok(output) => Ok(Message::tool_result(call, output)),
            Err(e @ (AgentError::Tool(_) | AgentError::InvalidInput(_))) => {
                tracing::debug!(tool = %call.name, error = %e, "Tool call rejected");
                Ok(Message::tool_result(call, json!({ "error": e.to_string() }).to_string()))
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: &Value) -> Result<T> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| AgentError::Tool(format!("invalid arguments for {tool}: {e}")))
}

// =============================================================================
// retrieve_context
// =============================================================================

/// Searches the calling user's documents.
pub struct RetrieveContextTool {
    retrieve: Arc<RetrieveContext>,
    user_id: UserId,
}

#[derive(Deserialize)]
struct RetrieveArgs {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

impl RetrieveContextTool {
    /// Tool name.
    pub const NAME: &'static str = "retrieve_context";

    /// Bind the tool to `user_id`.
    #[must_use]
    pub const fn new(retrieve: Arc<RetrieveContext>, user_id: UserId) -> Self {
        Self { retrieve, user_id }
    }
}

#[async_trait]
impl Tool for RetrieveContextTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Self::NAME.to_string(),
            description: "Search the user's uploaded documents (resumes, cover letters, \
                          portfolios) and return the most relevant passages."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "What to look for" },
                    "k": { "type": "integer", "description": "Number of passages", "minimum": 1, "maximum": MAX_RETRIEVE_K }
                },
                "required": ["query"]
            }),
        }
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let args: RetrieveArgs = parse_args(Self::NAME, arguments)?;
        let k = args.k.unwrap_or(DEFAULT_K).clamp(1, MAX_RETRIEVE_K);

        let chunks = self.retrieve.execute(&self.user_id, &args.query, k).await?;
        tracing::debug!(user_id = %self.user_id, results = chunks.len(), "Retrieved context");

        let passages: Vec<Value> = chunks
            .iter()
            .map(|c| {
                json!({
                    "document_id": c.chunk.document_id.to_string(),
                    "source": c.chunk.metadata.source,
                    "score": c.score,
                    "content": c.chunk.content,
                })
            })
            .collect();
        Ok(Value::Array(passages).to_string())
    }
}

// =============================================================================
// propose_action
// =============================================================================

/// Records an action for the user to confirm.
pub struct ProposeActionTool {
    actions: Arc<dyn ActionStore>,
    conversation_id: ConversationId,
    message_id: MessageId,
    events: Option<mpsc::Sender<ChatEvent>>,
}

#[derive(Deserialize)]
struct ProposeArgs {
    action_type: ActionType,
    label: String,
    #[serde(default)]
    preview: String,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default = "default_requires_confirmation")]
    requires_confirmation: bool,
}

const fn default_requires_confirmation() -> bool {
    true
}

impl ProposeActionTool {
    /// Tool name.
    pub const NAME: &'static str = "propose_action";

    /// Bind the tool to the assistant message being generated.
    #[must_use]
    pub fn new(
        actions: Arc<dyn ActionStore>,
        conversation_id: ConversationId,
        message_id: MessageId,
        events: Option<mpsc::Sender<ChatEvent>>,
    ) -> Self {
        Self {
            actions,
            conversation_id,
            message_id,
            events,
        }
    }
}

#[async_trait]
impl Tool for ProposeActionTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Self::NAME.to_string(),
            description: "Propose an action the user can confirm or cancel: rewrite text, \
                          generate a document, or run a tool."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "action_type": { "type": "string", "enum": ["rewrite", "generate", "execute_tool"] },
                    "label": { "type": "string", "description": "Short button label" },
                    "preview": { "type": "string", "description": "What will change" },
                    "parameters": {
                        "type": "object",
                        "description": "rewrite: {text, instructions}; generate: {prompt}; execute_tool: {tool, arguments}"
                    },
                    "requires_confirmation": { "type": "boolean" }
                },
                "required": ["action_type", "label"]
            }),
        }
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let args: ProposeArgs = parse_args(Self::NAME, arguments)?;
        if args.label.trim().is_empty() {
            return Err(AgentError::Tool("label must not be empty".to_string()));
        }

        let now = Utc::now();
        let action = AgentAction {
            action_id: ActionId::generate(),
            conversation_id: self.conversation_id,
            message_id: self.message_id,
            action_type: args.action_type,
            label: args.label,
            preview: args.preview,
            requires_confirmation: args.requires_confirmation,
            parameters: args.parameters,
            status: ActionStatus::Proposed,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.actions.insert(action.clone());

        tracing::info!(
            action_id = %action.action_id,
            conversation_id = %self.conversation_id,
            "Proposed action"
        );

        let reply = json!({ "action_id": action.action_id.to_string(), "status": ActionStatus::Proposed });
        if let Some(tx) = &self.events {
            let _ = tx.send(ChatEvent::ActionProposed { action }).await;
        }
        Ok(reply.to_string())
    }
}
