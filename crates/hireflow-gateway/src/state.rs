//! Gateway application state.
//!
//! [`Services`] wires the use cases from their collaborators;
//! [`GatewayState`] adds authentication and configuration and is shared by
//! every handler.

use std::sync::Arc;
use std::time::Duration;

use hireflow_agent::{
    ActionService, ActionStore, AgentManager, AgentService, ChatConfig, ChatModel, ChatWithAgent,
    InMemoryActionStore, Interrupt, InterruptRegistry, LlmActionExecutor,
};
use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_profile::ProfileService;
use hireflow_rag::{
    BlobStorage, DeleteDocument, Embedder, GetDocument, ListDocuments, RetrieveContext,
    StoreVectorIndex, TextExtractor, TextSplitter, UploadDocument, VectorStore,
};
use hireflow_store::Store;

use crate::config::GatewayConfig;

/// Tunables for the use cases.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Chat loop settings.
    pub chat: ChatConfig,
    /// How long a proposed action waits for a decision.
    pub action_ttl: Duration,
    /// Most pending actions held at once.
    pub action_max_entries: usize,
    /// Chunking used at ingestion.
    pub splitter: TextSplitter,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            chat: ChatConfig::default(),
            action_ttl: hireflow_agent::actions::DEFAULT_ACTION_TTL,
            action_max_entries: hireflow_agent::actions::DEFAULT_MAX_ACTIONS,
            splitter: TextSplitter::default(),
        }
    }
}

/// The use cases behind the HTTP surface.
#[derive(Clone)]
pub struct Services {
    /// Record store, for user records.
    pub store: Arc<dyn Store>,
    /// Agents and conversations.
    pub agents: Arc<dyn AgentManager>,
    /// Chat turns.
    pub chat: Arc<ChatWithAgent>,
    /// Action decisions.
    pub actions: Arc<ActionService>,
    /// Turn interruption.
    pub interrupt: Arc<Interrupt>,
    /// Candidate profiles.
    pub profiles: Arc<ProfileService>,
    /// Document upload.
    pub upload: Arc<UploadDocument>,
    /// Document listing.
    pub list_documents: Arc<ListDocuments>,
    /// Document lookup.
    pub get_document: Arc<GetDocument>,
    /// Document deletion.
    pub delete_document: Arc<DeleteDocument>,
    /// Similarity search over the user's documents.
    pub retrieve: Arc<RetrieveContext>,
}

impl Services {
    /// Wire every use case around one store, blob backend, extractor,
    /// embedder and chat model.
    #[must_use]
    pub fn build(
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStorage>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        settings: ServiceSettings,
    ) -> Self {
        let vectors: Arc<dyn VectorStore> = Arc::new(StoreVectorIndex::new(Arc::clone(&store)));
        let retrieve = Arc::new(RetrieveContext::new(
            Arc::clone(&embedder),
            Arc::clone(&vectors),
        ));
        let pending: Arc<dyn ActionStore> = Arc::new(InMemoryActionStore::new(
            settings.action_ttl,
            settings.action_max_entries,
        ));
        let interrupts = InterruptRegistry::new();
        let executor = Arc::new(LlmActionExecutor::new(
            Arc::clone(&model),
            Arc::clone(&retrieve),
        ));

        Self {
            agents: Arc::new(AgentService::new(Arc::clone(&store))),
            chat: Arc::new(ChatWithAgent::new(
                Arc::clone(&store),
                model,
                Arc::clone(&retrieve),
                Arc::clone(&pending),
                interrupts.clone(),
                settings.chat,
            )),
            actions: Arc::new(ActionService::new(Arc::clone(&store), pending, executor)),
            interrupt: Arc::new(Interrupt::new(Arc::clone(&store), interrupts)),
            profiles: Arc::new(ProfileService::new(Arc::clone(&store))),
            upload: Arc::new(UploadDocument::new(
                Arc::clone(&store),
                Arc::clone(&blobs),
                extractor,
                embedder,
                vectors,
                settings.splitter,
            )),
            list_documents: Arc::new(ListDocuments::new(Arc::clone(&store))),
            get_document: Arc::new(GetDocument::new(Arc::clone(&store))),
            delete_document: Arc::new(DeleteDocument::new(Arc::clone(&store), blobs)),
            retrieve,
            store,
        }
    }
}

/// Shared application state for the gateway.
pub struct GatewayState<P, V>
where
    P: IdentityProvider,
    V: JwtValidator,
{
    /// The use cases.
    pub services: Services,
    /// Sign-up and sign-in delegate.
    pub identity: Arc<P>,
    /// The JWT validator for authentication.
    pub jwt_validator: Arc<V>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<P, V> GatewayState<P, V>
where
    P: IdentityProvider,
    V: JwtValidator,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        services: Services,
        identity: Arc<P>,
        jwt_validator: Arc<V>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            services,
            identity,
            jwt_validator,
            config,
        }
    }
}

impl<P, V> Clone for GatewayState<P, V>
where
    P: IdentityProvider,
    V: JwtValidator,
{
    fn clone(&self) -> Self {
        Self {
            services: self.services.clone(),
            identity: Arc::clone(&self.identity),
            jwt_validator: Arc::clone(&self.jwt_validator),
            config: self.config.clone(),
        }
    }
}
