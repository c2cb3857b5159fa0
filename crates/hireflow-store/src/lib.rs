//! `RocksDB` storage layer for hireflow.
//!
//! This crate provides persistent storage for users, documents and their
//! chunks, agents, conversations, messages and profiles using `RocksDB` with
//! column families for efficient indexing. Values are CBOR-encoded.
//!
//! # Architecture
//!
//! Each record type has a primary column family keyed by its ID, plus index
//! column families whose keys are concatenated IDs with empty values:
//!
//! - `documents_by_user`: `user_id || document_id`
//! - `chunks_by_document`: `document_id || chunk_index || chunk_id`
//! - `chunks_by_user`: `user_id || chunk_id`
//! - `agents_by_user`, `agents_by_type`
//! - `conversations_by_user_agent`: `user_id || agent_id || conversation_id`
//! - `messages_by_conversation`: `conversation_id || created_micros || message_id`
//!
//! # Example
//!
//! ```no_run
//! use hireflow_store::{RocksStore, Store};
//! use hireflow_core::UserId;
//!
//! let store = RocksStore::open("/tmp/hireflow-db").unwrap();
//!
//! let user_id = UserId::from_bytes([0u8; 32]);
//! let documents = store.list_documents_by_user(&user_id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;
pub use types::{
    Agent, AgentConfiguration, AgentStatus, AgentType, Certification, ChatMessage,
    ChunkMetadata, ContextPolicy, Conversation, Document, DocumentCategory, DocumentChunk,
    Education, Language, MemoryMode, MessageRole, MessageStatus, ProcessingStatus, Profile,
    ProfileBasics, Project, Role, Skill, SummarizationStrategy, User,
};

use hireflow_core::{AgentId, ConversationId, DocumentId, MessageId, UserId};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so services can hold an
/// `Arc<dyn Store>` and tests can swap implementations.
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert or update a user record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_user(&self, user: &User) -> Result<()>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    // =========================================================================
    // Document Operations
    // =========================================================================

    /// Insert or update a document record and its user index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_document(&self, document: &Document) -> Result<()>;

    /// Get a document by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_document(&self, document_id: &DocumentId) -> Result<Option<Document>>;

    /// Delete a document by ID.
    ///
    /// Chunks are not touched; see [`Store::delete_chunks_by_document`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the document doesn't exist.
    fn delete_document(&self, document_id: &DocumentId) -> Result<()>;

    /// List all documents belonging to a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_documents_by_user(&self, user_id: &UserId) -> Result<Vec<Document>>;

    // =========================================================================
    // Chunk Operations
    // =========================================================================

    /// Insert a batch of chunks atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is written then.
    fn put_chunks(&self, chunks: &[DocumentChunk]) -> Result<()>;

    /// List a document's chunks in `chunk_index` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_chunks_by_document(&self, document_id: &DocumentId) -> Result<Vec<DocumentChunk>>;

    /// List every chunk belonging to a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_chunks_by_user(&self, user_id: &UserId) -> Result<Vec<DocumentChunk>>;

    /// Delete all chunks of a document, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_chunks_by_document(&self, document_id: &DocumentId) -> Result<usize>;

    // =========================================================================
    // Agent Operations
    // =========================================================================

    /// Insert or update an agent record.
    ///
    /// This also maintains the user and type indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_agent(&self, agent: &Agent) -> Result<()>;

    /// Get an agent by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>>;

    /// List all agents owned by a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_agents_by_user(&self, user_id: &UserId) -> Result<Vec<Agent>>;

    /// List all agents of a given type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_agents_by_type(&self, agent_type: AgentType) -> Result<Vec<Agent>>;

    // =========================================================================
    // Conversation Operations
    // =========================================================================

    /// Insert or update a conversation record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Get a conversation by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_conversation(&self, conversation_id: &ConversationId) -> Result<Option<Conversation>>;

    /// Delete a conversation and all of its messages.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the conversation doesn't exist.
    fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<()>;

    /// List a user's conversations with one agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_conversations(&self, user_id: &UserId, agent_id: &AgentId)
        -> Result<Vec<Conversation>>;

    // =========================================================================
    // Message Operations
    // =========================================================================

    /// Append a message to its conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_message(&self, message: &ChatMessage) -> Result<()>;

    /// Get a message by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_message(&self, message_id: &MessageId) -> Result<Option<ChatMessage>>;

    /// List a conversation's messages in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>>;

    /// Update a message's status.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the message doesn't exist.
    fn update_message_status(&self, message_id: &MessageId, status: MessageStatus) -> Result<()>;

    // =========================================================================
    // Profile Operations
    // =========================================================================

    /// Insert or update a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_profile(&self, profile: &Profile) -> Result<()>;

    /// Get a user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>>;
}
