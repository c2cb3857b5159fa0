//! Agent-proposed actions and their confirmation state machine.
//!
//! During a threaded turn the model may propose an action (rewrite a
//! paragraph, generate a cover letter, run a tool). The action waits in the
//! [`ActionStore`] until the user confirms or cancels it.
//!
//! # State Machine
//!
//! ```text
//!     ┌──────────┐  cancel   ┌───────────┐
//!     │ Proposed │──────────▶│ Cancelled │
//!     └────┬─────┘           └───────────┘
//!          │ confirm
//!          ▼
//!     ┌───────────┐
//!     │ Confirmed │
//!     └────┬──────┘
//!          ▼
//!     ┌───────────┐     ┌───────────┐
//!     │ Executing │────▶│ Completed │
//!     └────┬──────┘     └───────────┘
//!          │            ┌───────────┐
//!          └───────────▶│  Failed   │
//!                       └───────────┘
//! ```
//!
//! Actions leave the store as soon as they reach a terminal state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hireflow_core::{ActionId, ConversationId, MessageId, UserId};
use hireflow_rag::RetrieveContext;
use hireflow_store::Store;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use crate::error::{AgentError, Result};
use crate::llm::{ChatModel, CompletionRequest, Message, ToolCall};
use crate::prompt::DEFAULT_TEMPERATURE;
use crate::tools::{RetrieveContextTool, ToolSet};

/// Default lifetime of a pending action.
pub const DEFAULT_ACTION_TTL: Duration = Duration::from_secs(60 * 60);

/// Default cap on pending actions held in memory.
pub const DEFAULT_MAX_ACTIONS: usize = 10_000;

// =============================================================================
// Types
// =============================================================================

/// Kind of work an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Rewrite a piece of text.
    Rewrite,
    /// Generate new text from a prompt.
    Generate,
    /// Run one of the agent's tools.
    ExecuteTool,
}

/// Position of an action in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting for the user's decision.
    Proposed,
    /// Accepted, not yet started.
    Confirmed,
    /// Running.
    Executing,
    /// Finished with a result.
    Completed,
    /// Finished with an error.
    Failed,
    /// Declined by the user.
    Cancelled,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proposed => "proposed",
            Self::Confirmed => "confirmed",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// An action proposed by the agent during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Unique identifier.
    pub action_id: ActionId,
    /// Conversation the action was proposed in.
    pub conversation_id: ConversationId,
    /// Assistant message that proposed it.
    pub message_id: MessageId,
    /// Kind of work.
    pub action_type: ActionType,
    /// Short label shown on the confirmation button.
    pub label: String,
    /// Human-readable preview of the effect.
    pub preview: String,
    /// Whether the client should ask before confirming.
    pub requires_confirmation: bool,
    /// Inputs for the executor.
    pub parameters: Map<String, Value>,
    /// Current status.
    pub status: ActionStatus,
    /// Output once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// The user's answer to a proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ActionDecision {
    /// Run the action, optionally overriding some parameters.
    Confirm {
        /// Keys replacing the proposed parameters (shallow merge).
        #[serde(default)]
        parameters_override: Option<Map<String, Value>>,
    },
    /// Drop the action.
    Cancel,
}

/// Progress notification emitted while a confirmed action runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// Action concerned.
    pub action_id: ActionId,
    /// Status reached.
    pub status: ActionStatus,
    /// Output, on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error, on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionEvent {
    fn from_action(action: &AgentAction) -> Self {
        Self {
            action_id: action.action_id,
            status: action.status,
            result: action.result.clone(),
            error: action.error.clone(),
        }
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Check if a status transition is valid according to the state machine.
#[must_use]
pub const fn is_valid_transition(from: ActionStatus, to: ActionStatus) -> bool {
    use ActionStatus::{Cancelled, Completed, Confirmed, Executing, Failed, Proposed};

    matches!(
        (from, to),
        (Proposed, Confirmed | Cancelled) | (Confirmed, Executing) | (Executing, Completed | Failed)
    )
}

/// Validates a status transition and returns the target status if valid.
///
/// # Errors
///
/// Returns `AgentError::ActionConflict` naming the current status otherwise.
pub fn validate_transition(
    action_id: &ActionId,
    from: ActionStatus,
    to: ActionStatus,
) -> Result<ActionStatus> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(AgentError::ActionConflict {
            action_id: *action_id,
            status: from,
        })
    }
}

/// Returns true once an action can no longer change.
#[must_use]
pub const fn is_terminal(status: ActionStatus) -> bool {
    matches!(
        status,
        ActionStatus::Completed | ActionStatus::Failed | ActionStatus::Cancelled
    )
}

// =============================================================================
// Storage
// =============================================================================

/// Holds actions awaiting a decision.
pub trait ActionStore: Send + Sync {
    /// Store a new action.
    fn insert(&self, action: AgentAction);

    /// Get an action by ID.
    fn get(&self, action_id: &ActionId) -> Option<AgentAction>;

    /// Replace a stored action, provided its current status is `expected`.
    ///
    /// # Errors
    ///
    /// Returns `ActionNotFound` if the action is gone and `ActionConflict`
    /// if it has moved on from `expected`.
    fn replace(&self, action: AgentAction, expected: ActionStatus) -> Result<()>;

    /// Remove an action, returning it if it was present.
    fn remove(&self, action_id: &ActionId) -> Option<AgentAction>;
}

struct Entry {
    inserted: Instant,
    action: AgentAction,
}

/// An in-memory [`ActionStore`] with TTL and size-cap eviction.
pub struct InMemoryActionStore {
    entries: Mutex<HashMap<ActionId, Entry>>,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryActionStore {
    /// Create a store evicting entries older than `ttl` and keeping at most
    /// `max_entries`.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock();
        self.prune(&mut entries);
        entries.len()
    }

    /// Returns true if no live entry remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&self, entries: &mut HashMap<ActionId, Entry>) {
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted.elapsed() < ttl);
    }
}

impl Default for InMemoryActionStore {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_TTL, DEFAULT_MAX_ACTIONS)
    }
}

impl ActionStore for InMemoryActionStore {
    fn insert(&self, action: AgentAction) {
        let mut entries = self.entries.lock();
        self.prune(&mut entries);

        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                    tracing::debug!(action_id = %id, "Evicted pending action");
                }
                None => break,
            }
        }

        entries.insert(
            action.action_id,
            Entry {
                inserted: Instant::now(),
                action,
            },
        );
    }

    fn get(&self, action_id: &ActionId) -> Option<AgentAction> {
        let mut entries = self.entries.lock();
        self.prune(&mut entries);
        entries.get(action_id).map(|entry| entry.action.clone())
    }

    fn replace(&self, action: AgentAction, expected: ActionStatus) -> Result<()> {
        let mut entries = self.entries.lock();
        self.prune(&mut entries);

        let entry = entries
            .get_mut(&action.action_id)
            .ok_or(AgentError::ActionNotFound(action.action_id))?;
        if entry.action.status != expected {
            return Err(AgentError::ActionConflict {
                action_id: action.action_id,
                status: entry.action.status,
            });
        }
        entry.action = action;
        Ok(())
    }

    fn remove(&self, action_id: &ActionId) -> Option<AgentAction> {
        self.entries.lock().remove(action_id).map(|entry| entry.action)
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Runs confirmed actions.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute `action` on behalf of `user_id`, returning its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the action cannot be carried out.
    async fn execute(&self, user_id: &UserId, action: &AgentAction) -> Result<Value>;
}

/// Executes rewrite and generate actions through the chat model and
/// `execute_tool` actions through the agent's tool set.
pub struct LlmActionExecutor {
    model: Arc<dyn ChatModel>,
    retrieve: Arc<RetrieveContext>,
}

impl LlmActionExecutor {
    /// Create the executor.
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, retrieve: Arc<RetrieveContext>) -> Self {
        Self { model, retrieve }
    }

    fn string_param<'a>(action: &'a AgentAction, key: &str) -> Result<&'a str> {
        action
            .parameters
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AgentError::InvalidInput(format!("missing parameter: {key}")))
    }

    async fn complete(&self, system: &str, user: String) -> Result<Value> {
        let completion = self
            .model
            .complete(&CompletionRequest {
                messages: vec![Message::system(system), Message::user(user)],
                tools: Vec::new(),
                temperature: DEFAULT_TEMPERATURE,
            })
            .await?;
        Ok(json!({ "text": completion.content }))
    }
}

#[async_trait]
impl ActionExecutor for LlmActionExecutor {
    async fn execute(&self, user_id: &UserId, action: &AgentAction) -> Result<Value> {
        match action.action_type {
            ActionType::Rewrite => {
                let text = Self::string_param(action, "text")?;
                let instructions = action
                    .parameters
                    .get("instructions")
                    .and_then(Value::as_str)
                    .unwrap_or("Improve clarity and impact.");
                self.complete(
                    "Rewrite the text you are given following the instructions. \
                     Reply with the rewritten text only.",
                    format!("Instructions: {instructions}\n\nText:\n{text}"),
                )
                .await
            }
            ActionType::Generate => {
                let prompt = Self::string_param(action, "prompt")?;
                self.complete(
                    "Write the requested content for a job seeker. Reply with the content only.",
                    prompt.to_string(),
                )
                .await
            }
            ActionType::ExecuteTool => {
                let name = Self::string_param(action, "tool")?;
                let tools = ToolSet::new().with(RetrieveContextTool::new(
                    Arc::clone(&self.retrieve),
                    *user_id,
                ));
                let call = ToolCall {
                    id: action.action_id.to_string(),
                    name: name.to_string(),
                    arguments: action
                        .parameters
                        .get("arguments")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Map::new())),
                };
                let output = tools.invoke(&call).await?;
                Ok(json!({ "output": output }))
            }
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Outcome of accepting a decision, before any execution.
#[derive(Debug, Clone)]
pub enum Decided {
    /// The action was cancelled and removed.
    Cancelled(AgentAction),
    /// The action was confirmed and awaits [`ActionService::run`].
    Confirmed(AgentAction),
}

/// Removes an action from the store when dropped.
struct RemoveOnDrop {
    actions: Arc<dyn ActionStore>,
    action_id: ActionId,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        self.actions.remove(&self.action_id);
    }
}

/// Applies user decisions to pending actions.
pub struct ActionService {
    store: Arc<dyn Store>,
    actions: Arc<dyn ActionStore>,
    executor: Arc<dyn ActionExecutor>,
}

impl ActionService {
    /// Create the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        actions: Arc<dyn ActionStore>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            store,
            actions,
            executor,
        }
    }

    /// Decide on an action and, when confirmed, run it to completion.
    ///
    /// Events go to `events` when given; cancelling emits none.
    ///
    /// # Errors
    ///
    /// See [`ActionService::accept`]. Execution failures are reported in the
    /// returned action, not as errors.
    pub async fn decide(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
        action_id: &ActionId,
        decision: ActionDecision,
        events: Option<mpsc::Sender<ActionEvent>>,
    ) -> Result<AgentAction> {
        match self.accept(user_id, conversation_id, action_id, decision)? {
            Decided::Cancelled(action) => Ok(action),
            Decided::Confirmed(action) => Ok(self.run(user_id, action, events).await),
        }
    }

    /// Validate and record a decision without executing anything.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` / `ConversationForbidden` for a missing or
    ///   foreign conversation.
    /// - `ActionNotFound` if the action is unknown, expired or belongs to a
    ///   different conversation.
    /// - `ActionConflict` if the action is no longer proposed.
    pub fn accept(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
        action_id: &ActionId,
        decision: ActionDecision,
    ) -> Result<Decided> {
        let conversation = self
            .store
            .get_conversation(conversation_id)?
            .ok_or(AgentError::ConversationNotFound(*conversation_id))?;
        if conversation.user_id != *user_id {
            return Err(AgentError::ConversationForbidden {
                user_id: *user_id,
                conversation_id: *conversation_id,
            });
        }

        let mut action = self
            .actions
            .get(action_id)
            .filter(|a| a.conversation_id == *conversation_id)
            .ok_or(AgentError::ActionNotFound(*action_id))?;

        match decision {
            ActionDecision::Cancel => {
                action.status =
                    validate_transition(action_id, action.status, ActionStatus::Cancelled)?;
                action.updated_at = Utc::now();
                self.actions.replace(action.clone(), ActionStatus::Proposed)?;
                self.actions.remove(action_id);

                tracing::info!(action_id = %action_id, "Cancelled action");
                Ok(Decided::Cancelled(action))
            }
            ActionDecision::Confirm {
                parameters_override,
            } => {
                action.status =
                    validate_transition(action_id, action.status, ActionStatus::Confirmed)?;
                if let Some(overrides) = parameters_override {
                    action.parameters.extend(overrides);
                }
                action.updated_at = Utc::now();
                self.actions.replace(action.clone(), ActionStatus::Proposed)?;

                tracing::info!(action_id = %action_id, "Confirmed action");
                Ok(Decided::Confirmed(action))
            }
        }
    }

    /// Execute a confirmed action, emitting `executing` then `completed` or
    /// `failed`.
    ///
    /// The action is removed from the store when this returns, when the
    /// executor panics, or when the future is dropped.
    pub async fn run(
        &self,
        user_id: &UserId,
        mut action: AgentAction,
        events: Option<mpsc::Sender<ActionEvent>>,
    ) -> AgentAction {
        let _guard = RemoveOnDrop {
            actions: Arc::clone(&self.actions),
            action_id: action.action_id,
        };

        action.status = ActionStatus::Executing;
        action.updated_at = Utc::now();
        if let Err(e) = self.actions.replace(action.clone(), ActionStatus::Confirmed) {
            tracing::warn!(action_id = %action.action_id, error = %e, "Action changed before execution");
        }
        emit(events.as_ref(), ActionEvent::from_action(&action)).await;

        let executor = Arc::clone(&self.executor);
        let task_user = *user_id;
        let task_action = action.clone();
        let outcome = tokio::spawn(async move { executor.execute(&task_user, &task_action).await })
            .await
            .unwrap_or_else(|e| Err(AgentError::Internal(format!("action executor aborted: {e}"))));

        match outcome {
            Ok(result) => {
                action.status = ActionStatus::Completed;
                action.result = Some(result);
                tracing::info!(action_id = %action.action_id, "Action completed");
            }
            Err(e) => {
                action.status = ActionStatus::Failed;
                action.error = Some(e.to_string());
                tracing::warn!(action_id = %action.action_id, error = %e, "Action failed");
            }
        }
        action.updated_at = Utc::now();
        emit(events.as_ref(), ActionEvent::from_action(&action)).await;

        action
    }
}

async fn emit<T>(events: Option<&mpsc::Sender<T>>, event: T) {
    if let Some(tx) = events {
        // A closed receiver means the client went away; the work still finishes.
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::AgentId;
    use hireflow_store::{ContextPolicy, Conversation, RocksStore};
    use tempfile::TempDir;

    struct FixedExecutor(Result<Value>);

    #[async_trait]
    impl ActionExecutor for FixedExecutor {
        async fn execute(&self, _user_id: &UserId, action: &AgentAction) -> Result<Value> {
            match &self.0 {
                Ok(_) => Ok(Value::Object(action.parameters.clone())),
                Err(e) => Err(AgentError::Tool(e.to_string())),
            }
        }
    }

    struct PanickingExecutor;

    #[async_trait]
    impl ActionExecutor for PanickingExecutor {
        async fn execute(&self, _user_id: &UserId, _action: &AgentAction) -> Result<Value> {
            panic!("executor blew up");
        }
    }

    struct Fixture {
        service: ActionService,
        actions: Arc<InMemoryActionStore>,
        user_id: UserId,
        conversation_id: ConversationId,
        _dir: TempDir,
    }

    fn setup(executor: Arc<dyn ActionExecutor>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let user_id = UserId::from_bytes([4u8; 32]);
        let conversation = Conversation {
            conversation_id: ConversationId::generate(),
            agent_id: AgentId::generate(),
            user_id,
            title: None,
            context_policy: ContextPolicy::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.put_conversation(&conversation).unwrap();

        let actions = Arc::new(InMemoryActionStore::default());
        let service = ActionService::new(store, actions.clone(), executor);
        Fixture {
            service,
            actions,
            user_id,
            conversation_id: conversation.conversation_id,
            _dir: dir,
        }
    }

    fn proposed(conversation_id: ConversationId) -> AgentAction {
        let mut parameters = Map::new();
        parameters.insert("text".to_string(), json!("old"));
        parameters.insert("tone".to_string(), json!("formal"));
        AgentAction {
            action_id: ActionId::generate(),
            conversation_id,
            message_id: MessageId::generate(),
            action_type: ActionType::Rewrite,
            label: "Rewrite summary".to_string(),
            preview: "A tighter summary".to_string(),
            requires_confirmation: true,
            parameters,
            status: ActionStatus::Proposed,
            result: None,
            error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn drain(rx: &mut mpsc::Receiver<ActionEvent>) -> Vec<ActionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn valid_transitions() {
        use ActionStatus::*;

        assert!(is_valid_transition(Proposed, Confirmed));
        assert!(is_valid_transition(Proposed, Cancelled));
        assert!(is_valid_transition(Confirmed, Executing));
        assert!(is_valid_transition(Executing, Completed));
        assert!(is_valid_transition(Executing, Failed));

        assert!(!is_valid_transition(Proposed, Executing));
        assert!(!is_valid_transition(Confirmed, Cancelled));
        assert!(!is_valid_transition(Completed, Confirmed));
        assert!(!is_valid_transition(Cancelled, Proposed));
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal(ActionStatus::Completed));
        assert!(is_terminal(ActionStatus::Failed));
        assert!(is_terminal(ActionStatus::Cancelled));
        assert!(!is_terminal(ActionStatus::Executing));
    }

    #[test]
    fn decision_wire_format() {
        let confirm: ActionDecision = serde_json::from_value(json!({
            "decision": "confirm",
            "parameters_override": { "tone": "casual" }
        }))
        .unwrap();
        assert!(matches!(
            confirm,
            ActionDecision::Confirm { parameters_override: Some(ref m) } if m["tone"] == "casual"
        ));

        let cancel: ActionDecision =
            serde_json::from_value(json!({ "decision": "cancel" })).unwrap();
        assert_eq!(cancel, ActionDecision::Cancel);
    }

    #[tokio::test]
    async fn confirm_merges_override_and_completes() {
        let f = setup(Arc::new(FixedExecutor(Ok(Value::Null))));
        let action = proposed(f.conversation_id);
        f.actions.insert(action.clone());

        let mut overrides = Map::new();
        overrides.insert("tone".to_string(), json!("casual"));
        let (tx, mut rx) = mpsc::channel(8);

        let done = f
            .service
            .decide(
                &f.user_id,
                &f.conversation_id,
                &action.action_id,
                ActionDecision::Confirm {
                    parameters_override: Some(overrides),
                },
                Some(tx),
            )
            .await
            .unwrap();

        assert_eq!(done.status, ActionStatus::Completed);
        // The fixed executor echoes the parameters it ran with
        assert_eq!(done.result, Some(json!({ "text": "old", "tone": "casual" })));

        let events = drain(&mut rx);
        let statuses: Vec<_> = events.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![ActionStatus::Executing, ActionStatus::Completed]);
        assert!(events[1].result.is_some());
        assert!(f.actions.get(&action.action_id).is_none());
    }

    #[tokio::test]
    async fn executor_error_fails_action() {
        let f = setup(Arc::new(FixedExecutor(Err(AgentError::Tool("boom".into())))));
        let action = proposed(f.conversation_id);
        f.actions.insert(action.clone());
        let (tx, mut rx) = mpsc::channel(8);

        let done = f
            .service
            .decide(
                &f.user_id,
                &f.conversation_id,
                &action.action_id,
                ActionDecision::Confirm {
                    parameters_override: None,
                },
                Some(tx),
            )
            .await
            .unwrap();

        assert_eq!(done.status, ActionStatus::Failed);
        assert!(done.error.unwrap().contains("boom"));
        let events = drain(&mut rx);
        assert_eq!(events.last().unwrap().status, ActionStatus::Failed);
        assert!(f.actions.get(&action.action_id).is_none());
    }

    #[tokio::test]
    async fn executor_panic_still_removes_action() {
        let f = setup(Arc::new(PanickingExecutor));
        let action = proposed(f.conversation_id);
        f.actions.insert(action.clone());

        let done = f
            .service
            .decide(
                &f.user_id,
                &f.conversation_id,
                &action.action_id,
                ActionDecision::Confirm {
                    parameters_override: None,
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(done.status, ActionStatus::Failed);
        assert!(f.actions.is_empty());
    }

    #[tokio::test]
    async fn cancel_removes_without_events() {
        let f = setup(Arc::new(FixedExecutor(Ok(Value::Null))));
        let action = proposed(f.conversation_id);
        f.actions.insert(action.clone());
        let (tx, mut rx) = mpsc::channel(8);

        let done = f
            .service
            .decide(
                &f.user_id,
                &f.conversation_id,
                &action.action_id,
                ActionDecision::Cancel,
                Some(tx),
            )
            .await
            .unwrap();

        assert_eq!(done.status, ActionStatus::Cancelled);
        assert!(drain(&mut rx).is_empty());
        assert!(f.actions.get(&action.action_id).is_none());
    }

    #[tokio::test]
    async fn non_proposed_action_conflicts() {
        let f = setup(Arc::new(FixedExecutor(Ok(Value::Null))));
        let mut action = proposed(f.conversation_id);
        action.status = ActionStatus::Executing;
        f.actions.insert(action.clone());

        let result = f.service.accept(
            &f.user_id,
            &f.conversation_id,
            &action.action_id,
            ActionDecision::Cancel,
        );

        match result {
            Err(AgentError::ActionConflict { status, .. }) => {
                assert_eq!(status, ActionStatus::Executing);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert!(f.actions.get(&action.action_id).is_some());
    }

    #[tokio::test]
    async fn action_from_other_conversation_is_not_found() {
        let f = setup(Arc::new(FixedExecutor(Ok(Value::Null))));
        let action = proposed(ConversationId::generate());
        f.actions.insert(action.clone());

        let result = f.service.accept(
            &f.user_id,
            &f.conversation_id,
            &action.action_id,
            ActionDecision::Cancel,
        );

        assert!(matches!(result, Err(AgentError::ActionNotFound(_))));
    }

    #[tokio::test]
    async fn foreign_conversation_is_forbidden() {
        let f = setup(Arc::new(FixedExecutor(Ok(Value::Null))));
        let action = proposed(f.conversation_id);
        f.actions.insert(action.clone());
        let stranger = UserId::from_bytes([9u8; 32]);

        let result = f.service.accept(
            &stranger,
            &f.conversation_id,
            &action.action_id,
            ActionDecision::Cancel,
        );

        assert!(matches!(result, Err(AgentError::ConversationForbidden { .. })));
    }

    #[test]
    fn store_evicts_oldest_when_full() {
        let store = InMemoryActionStore::new(DEFAULT_ACTION_TTL, 2);
        let conversation_id = ConversationId::generate();
        let first = proposed(conversation_id);
        let second = proposed(conversation_id);
        let third = proposed(conversation_id);

        store.insert(first.clone());
        std::thread::sleep(Duration::from_millis(2));
        store.insert(second.clone());
        std::thread::sleep(Duration::from_millis(2));
        store.insert(third.clone());

        assert_eq!(store.len(), 2);
        assert!(store.get(&first.action_id).is_none());
        assert!(store.get(&second.action_id).is_some());
        assert!(store.get(&third.action_id).is_some());
    }

    #[test]
    fn store_expires_entries() {
        let store = InMemoryActionStore::new(Duration::from_millis(20), 10);
        let action = proposed(ConversationId::generate());
        store.insert(action.clone());
        assert!(store.get(&action.action_id).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(store.get(&action.action_id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn replace_checks_expected_status() {
        let store = InMemoryActionStore::default();
        let mut action = proposed(ConversationId::generate());
        store.insert(action.clone());

        action.status = ActionStatus::Confirmed;
        store.replace(action.clone(), ActionStatus::Proposed).unwrap();

        let again = store.replace(action.clone(), ActionStatus::Proposed);
        assert!(matches!(
            again,
            Err(AgentError::ActionConflict {
                status: ActionStatus::Confirmed,
                ..
            })
        ));
    }
}
