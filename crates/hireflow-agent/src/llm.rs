//! Chat model providers.
//!
//! [`ChatModel`] is the single capability the agent loop needs: send a
//! conversation plus tool declarations, get back text and/or tool calls.
//! Each vendor gets one implementation speaking its REST dialect; the
//! provider is picked at startup through [`ProviderKind`].

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use hireflow_rag::embedding::{GEMINI_BASE_URL, OPENAI_BASE_URL};
use hireflow_rag::{Embedder, EmbeddingConfig, GeminiEmbedder, OpenAiEmbedder};

use crate::error::{AgentError, Result};

// =============================================================================
// Messages
// =============================================================================

/// Author of a model message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Instructions for the model.
    System,
    /// The end user.
    User,
    /// The model.
    Assistant,
    /// A tool result.
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call ID, echoed back with the result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON value.
    pub arguments: Value,
}

/// One message of a model conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author.
    pub role: ChatRole,
    /// Text content.
    pub content: String,
    /// Tool calls made by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool results, the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// For tool results, the tool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// An assistant message carrying tool calls.
    #[must_use]
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(ChatRole::Assistant, content)
        }
    }

    /// The result of `call`.
    #[must_use]
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::new(ChatRole::Tool, content)
        }
    }
}

/// Declaration of a tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// Input to one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The conversation so far.
    pub messages: Vec<Message>,
    /// Tools the model may call; empty disables tool calling.
    pub tools: Vec<ToolSpec>,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Output of one model call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Text content, possibly empty when the model only calls tools.
    pub content: String,
    /// Requested tool calls.
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// A text-only completion.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A completion that only calls tools.
    #[must_use]
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }
}

/// A chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion.
    ///
    /// # Errors
    ///
    /// Returns `Model` if the provider call fails.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

// =============================================================================
// Provider selection
// =============================================================================

/// Supported model vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI or any OpenAI-compatible endpoint.
    OpenAi,
    /// Google Gemini.
    Gemini,
}

impl ProviderKind {
    /// The vendor's public API base.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_BASE_URL,
            Self::Gemini => GEMINI_BASE_URL,
        }
    }

    /// Build the vendor's embedder.
    #[must_use]
    pub fn embedder(self, config: EmbeddingConfig) -> Arc<dyn Embedder> {
        match self {
            Self::OpenAi => Arc::new(OpenAiEmbedder::new(config)),
            Self::Gemini => Arc::new(GeminiEmbedder::new(config)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            other => Err(AgentError::InvalidInput(format!(
                "unknown model provider: {other}"
            ))),
        }
    }
}

/// Connection settings for a chat model.
#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    /// Vendor.
    pub provider: ProviderKind,
    /// API base URL without trailing slash.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Model name.
    pub model: String,
}

impl ChatModelConfig {
    /// Create a configuration using the vendor's default base URL.
    #[must_use]
    pub fn new(provider: ProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Override the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Build the chat model for `config.provider`.
#[must_use]
pub fn build_chat_model(config: ChatModelConfig) -> Arc<dyn ChatModel> {
    match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAiChatModel::new(config)),
        ProviderKind::Gemini => Arc::new(GeminiChatModel::new(config)),
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .expect("failed to create HTTP client")
}

async fn send_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| AgentError::Model(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgentError::Model(format!("HTTP {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| AgentError::Model(format!("invalid response: {e}")))
}

// =============================================================================
// OpenAI
// =============================================================================

/// Chat model speaking the OpenAI `/chat/completions` API.
pub struct OpenAiChatModel {
    config: ChatModelConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

impl OpenAiChatModel {
    /// Create a new model client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: ChatModelConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }

    fn encode_message(message: &Message) -> Value {
        match message.role {
            ChatRole::System => json!({ "role": "system", "content": message.content }),
            ChatRole::User => json!({ "role": "user", "content": message.content }),
            ChatRole::Assistant if message.tool_calls.is_empty() => {
                json!({ "role": "assistant", "content": message.content })
            }
            ChatRole::Assistant => {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": { "name": c.name, "arguments": c.arguments.to_string() }
                        })
                    })
                    .collect();
                json!({
                    "role": "assistant",
                    "content": (!message.content.is_empty()).then_some(&message.content),
                    "tool_calls": calls
                })
            }
            ChatRole::Tool => json!({
                "role": "tool",
                "tool_call_id": message.tool_call_id,
                "content": message.content
            }),
        }
    }

    fn encode(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": request.messages.iter().map(Self::encode_message).collect::<Vec<_>>(),
            "temperature": request.temperature,
        });
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters
                        }
                    })
                })
                .collect();
        }
        body
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Requesting completion"
        );

        let raw = send_json(
            self.client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&self.encode(request)),
        )
        .await?;

        let response: OpenAiResponse = serde_json::from_value(raw)
            .map_err(|e| AgentError::Model(format!("invalid response: {e}")))?;
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Model("no choices in response".to_string()))?
            .message;

        Ok(Completion {
            content: message.content.unwrap_or_default(),
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    arguments: serde_json::from_str(&c.function.arguments)
                        .unwrap_or(Value::String(c.function.arguments)),
                    name: c.function.name,
                })
                .collect(),
        })
    }
}

// =============================================================================
// Gemini
// =============================================================================

/// Chat model speaking the Gemini `generateContent` API.
pub struct GeminiChatModel {
    config: ChatModelConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

impl GeminiChatModel {
    /// Create a new model client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: ChatModelConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }

    fn encode(request: &CompletionRequest) -> Value {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut contents: Vec<Value> = Vec::new();
        let mut pending_responses: Vec<Value> = Vec::new();
        for m in &request.messages {
            if m.role == ChatRole::Tool {
                pending_responses.push(json!({
                    "functionResponse": {
                        "name": m.name,
                        "response": { "content": m.content }
                    }
                }));
                continue;
            }
            // Every result of one model turn goes back in a single content
            if !pending_responses.is_empty() {
                contents.push(json!({
                    "role": "user",
                    "parts": std::mem::take(&mut pending_responses),
                }));
            }
            match m.role {
                ChatRole::System | ChatRole::Tool => {}
                ChatRole::User => {
                    contents.push(json!({ "role": "user", "parts": [{ "text": m.content }] }));
                }
                ChatRole::Assistant => {
                    let mut parts = Vec::new();
                    if !m.content.is_empty() {
                        parts.push(json!({ "text": m.content }));
                    }
                    parts.extend(m.tool_calls.iter().map(|c| {
                        json!({ "functionCall": { "name": c.name, "args": c.arguments } })
                    }));
                    contents.push(json!({ "role": "model", "parts": parts }));
                }
            }
        }
        if !pending_responses.is_empty() {
            contents.push(json!({ "role": "user", "parts": pending_responses }));
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": { "temperature": request.temperature },
        });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
        }
        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Requesting completion"
        );

        let raw = send_json(
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&Self::encode(request)),
        )
        .await?;

        let response: GeminiResponse = serde_json::from_value(raw)
            .map_err(|e| AgentError::Model(format!("invalid response: {e}")))?;
        let parts = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Model("no candidates in response".to_string()))?
            .content
            .parts;

        let mut completion = Completion::default();
        for part in parts {
            if let Some(text) = part.text {
                completion.content.push_str(&text);
            }
            if let Some(call) = part.function_call {
                // Gemini does not assign call IDs
                let id = format!("call_{}", completion.tool_calls.len());
                completion.tool_calls.push(ToolCall {
                    id,
                    name: call.name,
                    arguments: call.args,
                });
            }
        }
        Ok(completion)
    }
}

// =============================================================================
// Test double
// =============================================================================

/// A chat model replaying canned completions, for testing.
///
/// Every request is recorded. When the script runs out the model answers
/// with a `Model` error.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct ScriptedChatModel {
    replies: parking_lot::Mutex<VecDeque<Completion>>,
    requests: parking_lot::Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

#[cfg(any(test, feature = "test-utils"))]
impl ScriptedChatModel {
    /// Create a model that answers with `replies` in order.
    #[must_use]
    pub fn new(replies: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Sleep for `delay` before every answer.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| AgentError::Model("script exhausted".to_string()))
    }
}
