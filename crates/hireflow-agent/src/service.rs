//! Agent and conversation management.
//!
//! This module provides the `AgentManager` trait and `AgentService`
//! implementation covering agent CRUD and the conversations users hold with
//! them. Chat turns live in [`crate::chat`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hireflow_core::{AgentId, ConversationId, UserId};
use hireflow_store::{
    Agent, AgentConfiguration, AgentStatus, AgentType, ChatMessage, Conversation, Store,
};

use crate::error::{AgentError, Result};
use crate::types::{
    CreateAgentRequest, CreateConversationRequest, UpdateAgentRequest, MAX_AGENT_NAME_LEN,
};

/// Name of the agent created for users who have none.
pub const DEFAULT_AGENT_NAME: &str = "Career Assistant";

/// Trait defining agent and conversation operations.
#[async_trait]
pub trait AgentManager: Send + Sync {
    // =========================================================================
    // Agent Operations
    // =========================================================================

    /// Create a new agent owned by the user.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidInput` if the name is blank or too long.
    async fn create_agent(&self, user_id: &UserId, request: CreateAgentRequest) -> Result<Agent>;

    /// Get an agent the user may use: public, or owned.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::AgentNotFound` if the agent doesn't exist.
    /// Returns `AgentError::AgentForbidden` for another user's private agent.
    async fn get_agent(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Agent>;

    /// List the user's agents plus active public agents, oldest first.
    ///
    /// A user without agents gets a default private agent first.
    async fn list_agents(&self, user_id: &UserId) -> Result<Vec<Agent>>;

    /// Update an owned agent. Configuration changes bump its version.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::AgentForbidden` if the user doesn't own the agent.
    async fn update_agent(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        request: UpdateAgentRequest,
    ) -> Result<Agent>;

    /// Archive an owned agent.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::DefaultAgent` for the user's default agent.
    async fn archive_agent(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Agent>;

    // =========================================================================
    // Conversation Operations
    // =========================================================================

    /// Open a conversation with an agent.
    ///
    /// When the agent has threads disabled, the user's existing conversation
    /// is returned instead of a new one.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::AgentArchived` if the agent is archived.
    async fn create_conversation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        request: CreateConversationRequest,
    ) -> Result<Conversation>;

    /// List the user's conversations with an agent, most recent first.
    async fn list_conversations(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<Vec<Conversation>>;

    /// Get one of the user's conversations with an agent.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::ConversationNotFound` if it doesn't exist,
    /// `AgentError::ConversationForbidden` if it belongs to another user and
    /// `AgentError::ConversationAgentMismatch` if it belongs to another agent.
    async fn get_conversation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<Conversation>;

    /// Delete a conversation and its messages.
    async fn delete_conversation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<()>;

    /// List a conversation's messages in order.
    async fn list_messages(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatMessage>>;
}

/// Load an agent and check the user may use it.
pub(crate) fn accessible_agent(
    store: &dyn Store,
    user_id: &UserId,
    agent_id: &AgentId,
) -> Result<Agent> {
    let agent = store
        .get_agent(agent_id)?
        .ok_or(AgentError::AgentNotFound(*agent_id))?;

    if agent.agent_type == AgentType::Private && agent.user_id != *user_id {
        return Err(AgentError::AgentForbidden {
            user_id: *user_id,
            agent_id: *agent_id,
        });
    }
    Ok(agent)
}

/// Load a conversation and check it belongs to the user and the agent.
pub(crate) fn owned_conversation(
    store: &dyn Store,
    user_id: &UserId,
    agent_id: &AgentId,
    conversation_id: &ConversationId,
) -> Result<Conversation> {
    let conversation = store
        .get_conversation(conversation_id)?
        .ok_or(AgentError::ConversationNotFound(*conversation_id))?;

    if conversation.user_id != *user_id {
        return Err(AgentError::ConversationForbidden {
            user_id: *user_id,
            conversation_id: *conversation_id,
        });
    }
    if conversation.agent_id != *agent_id {
        return Err(AgentError::ConversationAgentMismatch {
            conversation_id: *conversation_id,
            agent_id: *agent_id,
        });
    }
    Ok(conversation)
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AgentError::InvalidInput("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_AGENT_NAME_LEN {
        return Err(AgentError::InvalidInput(format!(
            "name must be at most {MAX_AGENT_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// The agent service implementation.
pub struct AgentService {
    store: Arc<dyn Store>,
}

impl AgentService {
    /// Create a new agent service.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Get an agent and verify the user owns it.
    fn get_owned(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Agent> {
        let agent = self
            .store
            .get_agent(agent_id)?
            .ok_or(AgentError::AgentNotFound(*agent_id))?;

        if agent.user_id != *user_id {
            return Err(AgentError::AgentForbidden {
                user_id: *user_id,
                agent_id: *agent_id,
            });
        }
        Ok(agent)
    }

    fn create_default_agent(&self, user_id: &UserId) -> Result<Agent> {
        let now = Utc::now();
        let agent = Agent {
            agent_id: AgentId::generate(),
            user_id: *user_id,
            name: DEFAULT_AGENT_NAME.to_string(),
            agent_type: AgentType::Private,
            status: AgentStatus::Active,
            configuration: AgentConfiguration::default(),
            is_default: true,
            created_at: now,
            updated_at: now,
        };
        self.store.put_agent(&agent)?;

        tracing::info!(agent_id = %agent.agent_id, user_id = %user_id, "Created default agent");
        Ok(agent)
    }
}

#[async_trait]
impl AgentManager for AgentService {
    // =========================================================================
    // Agent Operations
    // =========================================================================

    async fn create_agent(&self, user_id: &UserId, request: CreateAgentRequest) -> Result<Agent> {
        let name = validate_name(&request.name)?;
        let defaults = AgentConfiguration::default();
        let now = Utc::now();

        let agent = Agent {
            agent_id: AgentId::generate(),
            user_id: *user_id,
            name,
            agent_type: request.agent_type.unwrap_or(AgentType::Private),
            status: AgentStatus::Active,
            configuration: AgentConfiguration {
                system_prompt: request.system_prompt.unwrap_or(defaults.system_prompt),
                tone: request.tone.unwrap_or(defaults.tone),
                enable_threads: request.enable_threads.unwrap_or(defaults.enable_threads),
                version: 1,
            },
            is_default: false,
            created_at: now,
            updated_at: now,
        };

        self.store.put_agent(&agent)?;

        tracing::info!(
            agent_id = %agent.agent_id,
            user_id = %user_id,
            name = %agent.name,
            "Created agent"
        );

        Ok(agent)
    }

    async fn get_agent(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Agent> {
        accessible_agent(self.store.as_ref(), user_id, agent_id)
    }

    async fn list_agents(&self, user_id: &UserId) -> Result<Vec<Agent>> {
        let mut agents = self.store.list_agents_by_user(user_id)?;
        if agents.is_empty() {
            agents.push(self.create_default_agent(user_id)?);
        }

        let public = self
            .store
            .list_agents_by_type(AgentType::Public)?
            .into_iter()
            .filter(|a| a.user_id != *user_id && a.status == AgentStatus::Active);
        agents.extend(public);

        agents.sort_by_key(|a| a.created_at);
        Ok(agents)
    }

    async fn update_agent(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        request: UpdateAgentRequest,
    ) -> Result<Agent> {
        let mut agent = self.get_owned(user_id, agent_id)?;
        if agent.status == AgentStatus::Archived {
            return Err(AgentError::AgentArchived(*agent_id));
        }

        if let Some(name) = request.name {
            agent.name = validate_name(&name)?;
        }
        if let Some(agent_type) = request.agent_type {
            agent.agent_type = agent_type;
        }

        let before = agent.configuration.clone();
        let config = &mut agent.configuration;
        if let Some(system_prompt) = request.system_prompt {
            config.system_prompt = system_prompt;
        }
        if let Some(tone) = request.tone {
            config.tone = tone;
        }
        if let Some(enable_threads) = request.enable_threads {
            config.enable_threads = enable_threads;
        }
        if *config != before {
            config.version += 1;
        }

        agent.updated_at = Utc::now();
        self.store.put_agent(&agent)?;

        tracing::info!(
            agent_id = %agent_id,
            version = agent.configuration.version,
            "Updated agent"
        );

        Ok(agent)
    }

    async fn archive_agent(&self, user_id: &UserId, agent_id: &AgentId) -> Result<Agent> {
        let mut agent = self.get_owned(user_id, agent_id)?;
        if agent.is_default {
            return Err(AgentError::DefaultAgent(*agent_id));
        }
        if agent.status == AgentStatus::Archived {
            return Ok(agent);
        }

        agent.status = AgentStatus::Archived;
        agent.updated_at = Utc::now();
        self.store.put_agent(&agent)?;

        tracing::info!(agent_id = %agent_id, user_id = %user_id, "Archived agent");

        Ok(agent)
    }

    // =========================================================================
    // Conversation Operations
    // =========================================================================

    async fn create_conversation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        request: CreateConversationRequest,
    ) -> Result<Conversation> {
        let agent = accessible_agent(self.store.as_ref(), user_id, agent_id)?;
        if agent.status == AgentStatus::Archived {
            return Err(AgentError::AgentArchived(*agent_id));
        }

        if !agent.configuration.enable_threads {
            let existing = self.store.list_conversations(user_id, agent_id)?;
            if let Some(conversation) = existing.into_iter().max_by_key(|c| c.updated_at) {
                return Ok(conversation);
            }
        }

        let context_policy = request.context_policy.unwrap_or_default();
        if context_policy.max_tokens == 0 {
            return Err(AgentError::InvalidInput(
                "context_policy.max_tokens must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let conversation = Conversation {
            conversation_id: ConversationId::generate(),
            agent_id: *agent_id,
            user_id: *user_id,
            title: request
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            context_policy,
            created_at: now,
            updated_at: now,
        };
        self.store.put_conversation(&conversation)?;

        tracing::info!(
            conversation_id = %conversation.conversation_id,
            agent_id = %agent_id,
            user_id = %user_id,
            "Created conversation"
        );

        Ok(conversation)
    }

    async fn list_conversations(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<Vec<Conversation>> {
        accessible_agent(self.store.as_ref(), user_id, agent_id)?;

        let mut conversations = self.store.list_conversations(user_id, agent_id)?;
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn get_conversation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<Conversation> {
        owned_conversation(self.store.as_ref(), user_id, agent_id, conversation_id)
    }

    async fn delete_conversation(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<()> {
        owned_conversation(self.store.as_ref(), user_id, agent_id, conversation_id)?;
        self.store.delete_conversation(conversation_id)?;

        tracing::info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            "Deleted conversation"
        );

        Ok(())
    }

    async fn list_messages(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatMessage>> {
        owned_conversation(self.store.as_ref(), user_id, agent_id, conversation_id)?;
        Ok(self.store.list_messages(conversation_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hireflow_core::MessageId;
    use hireflow_store::{MessageRole, MessageStatus, RocksStore};
    use tempfile::TempDir;

    fn setup() -> (AgentService, Arc<RocksStore>, TempDir, UserId) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let service = AgentService::new(store.clone());
        let user_id = UserId::from_bytes([1u8; 32]);
        (service, store, dir, user_id)
    }

    fn other_user() -> UserId {
        UserId::from_bytes([2u8; 32])
    }

    #[tokio::test]
    async fn create_agent_success() {
        let (service, _store, _dir, user_id) = setup();

        let request = CreateAgentRequest {
            tone: Some("friendly".to_string()),
            ..CreateAgentRequest::new("  Interview Coach ")
        };
        let agent = service.create_agent(&user_id, request).await.unwrap();

        assert_eq!(agent.name, "Interview Coach");
        assert_eq!(agent.user_id, user_id);
        assert_eq!(agent.agent_type, AgentType::Private);
        assert_eq!(agent.status, AgentStatus::Active);
        assert_eq!(agent.configuration.tone, "friendly");
        assert_eq!(agent.configuration.version, 1);
        assert!(!agent.is_default);
    }

    #[tokio::test]
    async fn create_agent_rejects_blank_name() {
        let (service, _store, _dir, user_id) = setup();

        let result = service
            .create_agent(&user_id, CreateAgentRequest::new("   "))
            .await;
        assert!(matches!(result, Err(AgentError::InvalidInput(_))));

        let long = "x".repeat(MAX_AGENT_NAME_LEN + 1);
        let result = service.create_agent(&user_id, CreateAgentRequest::new(long)).await;
        assert!(matches!(result, Err(AgentError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn get_agent_private_requires_owner() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(&user_id, CreateAgentRequest::new("mine"))
            .await
            .unwrap();

        let result = service.get_agent(&other_user(), &agent.agent_id).await;
        assert!(matches!(result, Err(AgentError::AgentForbidden { .. })));

        let missing = service.get_agent(&user_id, &AgentId::generate()).await;
        assert!(matches!(missing, Err(AgentError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn get_agent_public_open_to_all() {
        let (service, _store, _dir, user_id) = setup();
        let request = CreateAgentRequest {
            agent_type: Some(AgentType::Public),
            ..CreateAgentRequest::new("shared")
        };
        let agent = service.create_agent(&user_id, request).await.unwrap();

        let seen = service.get_agent(&other_user(), &agent.agent_id).await.unwrap();
        assert_eq!(seen.agent_id, agent.agent_id);
    }

    #[tokio::test]
    async fn list_agents_bootstraps_default_once() {
        let (service, _store, _dir, user_id) = setup();

        let first = service.list_agents(&user_id).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, DEFAULT_AGENT_NAME);
        assert!(first[0].is_default);
        assert_eq!(first[0].agent_type, AgentType::Private);

        let second = service.list_agents(&user_id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].agent_id, first[0].agent_id);
    }

    #[tokio::test]
    async fn list_agents_includes_active_public_agents() {
        let (service, _store, _dir, user_id) = setup();
        let other = other_user();

        let public = service
            .create_agent(
                &other,
                CreateAgentRequest {
                    agent_type: Some(AgentType::Public),
                    ..CreateAgentRequest::new("public")
                },
            )
            .await
            .unwrap();
        let archived = service
            .create_agent(
                &other,
                CreateAgentRequest {
                    agent_type: Some(AgentType::Public),
                    ..CreateAgentRequest::new("retired")
                },
            )
            .await
            .unwrap();
        service.archive_agent(&other, &archived.agent_id).await.unwrap();
        service
            .create_agent(&other, CreateAgentRequest::new("secret"))
            .await
            .unwrap();

        let agents = service.list_agents(&user_id).await.unwrap();
        let ids: Vec<_> = agents.iter().map(|a| a.agent_id).collect();

        // Default agent plus the one active public agent
        assert_eq!(agents.len(), 2);
        assert!(ids.contains(&public.agent_id));
        assert!(!ids.contains(&archived.agent_id));
    }

    #[tokio::test]
    async fn update_bumps_version_on_config_change() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(&user_id, CreateAgentRequest::new("coach"))
            .await
            .unwrap();

        let renamed = service
            .update_agent(
                &user_id,
                &agent.agent_id,
                UpdateAgentRequest {
                    name: Some("mentor".to_string()),
                    ..UpdateAgentRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "mentor");
        assert_eq!(renamed.configuration.version, 1);

        let retoned = service
            .update_agent(
                &user_id,
                &agent.agent_id,
                UpdateAgentRequest {
                    tone: Some("playful".to_string()),
                    ..UpdateAgentRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(retoned.configuration.tone, "playful");
        assert_eq!(retoned.configuration.version, 2);
    }

    #[tokio::test]
    async fn update_requires_owner_even_for_public() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(
                &user_id,
                CreateAgentRequest {
                    agent_type: Some(AgentType::Public),
                    ..CreateAgentRequest::new("shared")
                },
            )
            .await
            .unwrap();

        let result = service
            .update_agent(&other_user(), &agent.agent_id, UpdateAgentRequest::default())
            .await;
        assert!(matches!(result, Err(AgentError::AgentForbidden { .. })));
    }

    #[tokio::test]
    async fn archive_default_agent_conflicts() {
        let (service, _store, _dir, user_id) = setup();
        let default = service.list_agents(&user_id).await.unwrap().remove(0);

        let result = service.archive_agent(&user_id, &default.agent_id).await;
        assert!(matches!(result, Err(AgentError::DefaultAgent(_))));
    }

    #[tokio::test]
    async fn archive_is_idempotent() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(&user_id, CreateAgentRequest::new("temp"))
            .await
            .unwrap();

        let archived = service.archive_agent(&user_id, &agent.agent_id).await.unwrap();
        assert_eq!(archived.status, AgentStatus::Archived);
        let again = service.archive_agent(&user_id, &agent.agent_id).await.unwrap();
        assert_eq!(again.status, AgentStatus::Archived);
    }

    #[tokio::test]
    async fn conversation_rejected_on_archived_agent() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(&user_id, CreateAgentRequest::new("temp"))
            .await
            .unwrap();
        service.archive_agent(&user_id, &agent.agent_id).await.unwrap();

        let result = service
            .create_conversation(&user_id, &agent.agent_id, CreateConversationRequest::default())
            .await;
        assert!(matches!(result, Err(AgentError::AgentArchived(_))));
    }

    #[tokio::test]
    async fn conversation_reused_when_threads_disabled() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(
                &user_id,
                CreateAgentRequest {
                    enable_threads: Some(false),
                    ..CreateAgentRequest::new("single")
                },
            )
            .await
            .unwrap();

        let first = service
            .create_conversation(&user_id, &agent.agent_id, CreateConversationRequest::default())
            .await
            .unwrap();
        let second = service
            .create_conversation(&user_id, &agent.agent_id, CreateConversationRequest::default())
            .await
            .unwrap();

        assert_eq!(first.conversation_id, second.conversation_id);
    }

    #[tokio::test]
    async fn conversation_checks_owner_and_agent() {
        let (service, _store, _dir, user_id) = setup();
        let agent = service
            .create_agent(&user_id, CreateAgentRequest::new("a"))
            .await
            .unwrap();
        let other_agent = service
            .create_agent(&user_id, CreateAgentRequest::new("b"))
            .await
            .unwrap();
        let conversation = service
            .create_conversation(&user_id, &agent.agent_id, CreateConversationRequest::default())
            .await
            .unwrap();
        let id = conversation.conversation_id;

        let foreign = service.get_conversation(&other_user(), &agent.agent_id, &id).await;
        assert!(matches!(foreign, Err(AgentError::ConversationForbidden { .. })));

        let mismatch = service.get_conversation(&user_id, &other_agent.agent_id, &id).await;
        assert!(matches!(mismatch, Err(AgentError::ConversationAgentMismatch { .. })));

        let missing = service
            .get_conversation(&user_id, &agent.agent_id, &ConversationId::generate())
            .await;
        assert!(matches!(missing, Err(AgentError::ConversationNotFound(_))));
    }

    #[tokio::test]
    async fn delete_conversation_removes_messages() {
        let (service, store, _dir, user_id) = setup();
        let agent = service
            .create_agent(&user_id, CreateAgentRequest::new("a"))
            .await
            .unwrap();
        let conversation = service
            .create_conversation(&user_id, &agent.agent_id, CreateConversationRequest::default())
            .await
            .unwrap();
        let id = conversation.conversation_id;
        store
            .put_message(&ChatMessage {
                message_id: MessageId::generate(),
                conversation_id: id,
                role: MessageRole::User,
                content: "hello".to_string(),
                status: MessageStatus::Completed,
                created_at: Utc::now(),
            })
            .unwrap();
        assert_eq!(service.list_messages(&user_id, &agent.agent_id, &id).await.unwrap().len(), 1);

        service.delete_conversation(&user_id, &agent.agent_id, &id).await.unwrap();

        assert!(store.get_conversation(&id).unwrap().is_none());
        assert!(store.list_messages(&id).unwrap().is_empty());
    }
}
