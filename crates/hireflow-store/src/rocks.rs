//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use hireflow_core::{AgentId, ConversationId, DocumentId, MessageId, UserId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{
    Agent, AgentType, ChatMessage, Conversation, Document, DocumentChunk, MessageStatus, Profile,
    User,
};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::MissingColumnFamily(name.to_string()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Codec(e.to_string()))
    }

    /// Read and decode a single record.
    fn get_record<T>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Collect every key in an index column family that starts with `prefix`.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let iter = self.db.iterator_cf(
            &cf,
            IteratorMode::From(prefix, rocksdb::Direction::Forward),
        );

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key);
        }
        Ok(found)
    }

    /// Resolve index keys to primary records, skipping dangling entries.
    fn resolve<T>(&self, index_cf: &str, prefix: &[u8], primary_cf: &str) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut records = Vec::new();
        for key in self.scan_prefix(index_cf, prefix)? {
            let Some(id) = keys::trailing_uuid(&key) else {
                tracing::warn!(cf = index_cf, "Skipping malformed index key");
                continue;
            };
            if let Some(record) = self.get_record(primary_cf, &id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(StoreError::from)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    fn put_user(&self, user: &User) -> Result<()> {
        let cf = self.cf(cf::USERS)?;
        let key = keys::user_key(&user.user_id);
        let value = Self::serialize(user)?;

        self.db
            .put_cf(&cf, key, value)?;

        Ok(())
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get_record(cf::USERS, &keys::user_key(user_id))
    }

    // =========================================================================
    // Document Operations
    // =========================================================================

    fn put_document(&self, document: &Document) -> Result<()> {
        let cf_documents = self.cf(cf::DOCUMENTS)?;
        let cf_by_user = self.cf(cf::DOCUMENTS_BY_USER)?;

        let value = Self::serialize(document)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_documents, document.document_id.as_bytes(), &value);
        batch.put_cf(
            &cf_by_user,
            keys::user_document_key(&document.user_id, &document.document_id),
            [],
        );
        self.write(batch)
    }

    fn get_document(&self, document_id: &DocumentId) -> Result<Option<Document>> {
        self.get_record(cf::DOCUMENTS, document_id.as_bytes())
    }

    fn delete_document(&self, document_id: &DocumentId) -> Result<()> {
        let cf_documents = self.cf(cf::DOCUMENTS)?;
        let cf_by_user = self.cf(cf::DOCUMENTS_BY_USER)?;

        let document = self
            .get_document(document_id)?
            .ok_or_else(|| StoreError::not_found("document", document_id))?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_documents, document_id.as_bytes());
        batch.delete_cf(
            &cf_by_user,
            keys::user_document_key(&document.user_id, document_id),
        );
        self.write(batch)
    }

    fn list_documents_by_user(&self, user_id: &UserId) -> Result<Vec<Document>> {
        self.resolve(
            cf::DOCUMENTS_BY_USER,
            &keys::user_prefix(user_id),
            cf::DOCUMENTS,
        )
    }

    // =========================================================================
    // Chunk Operations
    // =========================================================================

    fn put_chunks(&self, chunks: &[DocumentChunk]) -> Result<()> {
        let cf_chunks = self.cf(cf::CHUNKS)?;
        let cf_by_document = self.cf(cf::CHUNKS_BY_DOCUMENT)?;
        let cf_by_user = self.cf(cf::CHUNKS_BY_USER)?;

        let mut batch = WriteBatch::default();
        for chunk in chunks {
            let value = Self::serialize(chunk)?;
            batch.put_cf(&cf_chunks, chunk.chunk_id.as_bytes(), &value);
            batch.put_cf(
                &cf_by_document,
                keys::document_chunk_key(&chunk.document_id, chunk.chunk_index, &chunk.chunk_id),
                [],
            );
            batch.put_cf(
                &cf_by_user,
                keys::user_chunk_key(&chunk.user_id, &chunk.chunk_id),
                [],
            );
        }
        self.write(batch)
    }

    fn list_chunks_by_document(&self, document_id: &DocumentId) -> Result<Vec<DocumentChunk>> {
        self.resolve(
            cf::CHUNKS_BY_DOCUMENT,
            document_id.as_bytes(),
            cf::CHUNKS,
        )
    }

    fn list_chunks_by_user(&self, user_id: &UserId) -> Result<Vec<DocumentChunk>> {
        self.resolve(
            cf::CHUNKS_BY_USER,
            &keys::user_prefix(user_id),
            cf::CHUNKS,
        )
    }

    fn delete_chunks_by_document(&self, document_id: &DocumentId) -> Result<usize> {
        let cf_chunks = self.cf(cf::CHUNKS)?;
        let cf_by_document = self.cf(cf::CHUNKS_BY_DOCUMENT)?;
        let cf_by_user = self.cf(cf::CHUNKS_BY_USER)?;

        let chunks = self.list_chunks_by_document(document_id)?;

        let mut batch = WriteBatch::default();
        for key in self.scan_prefix(cf::CHUNKS_BY_DOCUMENT, document_id.as_bytes())? {
            batch.delete_cf(&cf_by_document, key);
        }
        for chunk in &chunks {
            batch.delete_cf(&cf_chunks, chunk.chunk_id.as_bytes());
            batch.delete_cf(
                &cf_by_user,
                keys::user_chunk_key(&chunk.user_id, &chunk.chunk_id),
            );
        }
        self.write(batch)?;

        Ok(chunks.len())
    }

    // =========================================================================
    // Agent Operations
    // =========================================================================

    fn put_agent(&self, agent: &Agent) -> Result<()> {
        let cf_agents = self.cf(cf::AGENTS)?;
        let cf_by_user = self.cf(cf::AGENTS_BY_USER)?;
        let cf_by_type = self.cf(cf::AGENTS_BY_TYPE)?;

        let value = Self::serialize(agent)?;

        // Check if agent exists to handle type index updates
        let old_type = self
            .get_agent(&agent.agent_id)?
            .map(|a| a.agent_type);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_agents, agent.agent_id.as_bytes(), &value);
        batch.put_cf(
            &cf_by_user,
            keys::user_agent_key(&agent.user_id, &agent.agent_id),
            [],
        );

        if let Some(old) = old_type {
            if old != agent.agent_type {
                batch.delete_cf(
                    &cf_by_type,
                    keys::type_agent_key(old.as_u8(), &agent.agent_id),
                );
            }
        }
        batch.put_cf(
            &cf_by_type,
            keys::type_agent_key(agent.agent_type.as_u8(), &agent.agent_id),
            [],
        );

        self.write(batch)
    }

    fn get_agent(&self, agent_id: &AgentId) -> Result<Option<Agent>> {
        self.get_record(cf::AGENTS, agent_id.as_bytes())
    }

    fn list_agents_by_user(&self, user_id: &UserId) -> Result<Vec<Agent>> {
        self.resolve(
            cf::AGENTS_BY_USER,
            &keys::user_prefix(user_id),
            cf::AGENTS,
        )
    }

    fn list_agents_by_type(&self, agent_type: AgentType) -> Result<Vec<Agent>> {
        self.resolve(
            cf::AGENTS_BY_TYPE,
            &[agent_type.as_u8()],
            cf::AGENTS,
        )
    }

    // =========================================================================
    // Conversation Operations
    // =========================================================================

    fn put_conversation(&self, conversation: &Conversation) -> Result<()> {
        let cf_conversations = self.cf(cf::CONVERSATIONS)?;
        let cf_by_user_agent = self.cf(cf::CONVERSATIONS_BY_USER_AGENT)?;

        let value = Self::serialize(conversation)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_conversations,
            conversation.conversation_id.as_bytes(),
            &value,
        );
        batch.put_cf(
            &cf_by_user_agent,
            keys::user_agent_conversation_key(
                &conversation.user_id,
                &conversation.agent_id,
                &conversation.conversation_id,
            ),
            [],
        );
        self.write(batch)
    }

    fn get_conversation(&self, conversation_id: &ConversationId) -> Result<Option<Conversation>> {
        self.get_record(cf::CONVERSATIONS, conversation_id.as_bytes())
    }

    fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        let cf_conversations = self.cf(cf::CONVERSATIONS)?;
        let cf_by_user_agent = self.cf(cf::CONVERSATIONS_BY_USER_AGENT)?;
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_by_conversation = self.cf(cf::MESSAGES_BY_CONVERSATION)?;

        let conversation = self
            .get_conversation(conversation_id)?
            .ok_or_else(|| StoreError::not_found("conversation", conversation_id))?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_conversations, conversation_id.as_bytes());
        batch.delete_cf(
            &cf_by_user_agent,
            keys::user_agent_conversation_key(
                &conversation.user_id,
                &conversation.agent_id,
                conversation_id,
            ),
        );

        // Cascade to messages
        for key in self.scan_prefix(cf::MESSAGES_BY_CONVERSATION, conversation_id.as_bytes())? {
            if let Some(message_id) = keys::trailing_uuid(&key) {
                batch.delete_cf(&cf_messages, message_id);
            }
            batch.delete_cf(&cf_by_conversation, key);
        }

        self.write(batch)
    }

    fn list_conversations(
        &self,
        user_id: &UserId,
        agent_id: &AgentId,
    ) -> Result<Vec<Conversation>> {
        let prefix = keys::user_agent_key(user_id, agent_id);
        self.resolve(
            cf::CONVERSATIONS_BY_USER_AGENT,
            &prefix,
            cf::CONVERSATIONS,
        )
    }

    // =========================================================================
    // Message Operations
    // =========================================================================

    fn put_message(&self, message: &ChatMessage) -> Result<()> {
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_by_conversation = self.cf(cf::MESSAGES_BY_CONVERSATION)?;

        let value = Self::serialize(message)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_messages, message.message_id.as_bytes(), &value);
        batch.put_cf(
            &cf_by_conversation,
            keys::conversation_message_key(
                &message.conversation_id,
                &message.created_at,
                &message.message_id,
            ),
            [],
        );
        self.write(batch)
    }

    fn get_message(&self, message_id: &MessageId) -> Result<Option<ChatMessage>> {
        self.get_record(cf::MESSAGES, message_id.as_bytes())
    }

    fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>> {
        self.resolve(
            cf::MESSAGES_BY_CONVERSATION,
            conversation_id.as_bytes(),
            cf::MESSAGES,
        )
    }

    fn update_message_status(&self, message_id: &MessageId, status: MessageStatus) -> Result<()> {
        let mut message = self
            .get_message(message_id)?
            .ok_or_else(|| StoreError::not_found("message", message_id))?;
        message.status = status;

        // The index key depends only on immutable fields
        let cf = self.cf(cf::MESSAGES)?;
        let value = Self::serialize(&message)?;
        self.db
            .put_cf(&cf, message_id.as_bytes(), value)
            .map_err(StoreError::from)
    }

    // =========================================================================
    // Profile Operations
    // =========================================================================

    fn put_profile(&self, profile: &Profile) -> Result<()> {
        let cf = self.cf(cf::PROFILES)?;
        let value = Self::serialize(profile)?;

        self.db
            .put_cf(&cf, keys::user_key(&profile.user_id), value)
            .map_err(StoreError::from)
    }

    fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        self.get_record(cf::PROFILES, &keys::user_key(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AgentConfiguration, AgentStatus, ChunkMetadata, ContextPolicy, DocumentCategory,
        MessageRole, ProcessingStatus,
    };
    use chrono::{Duration, Utc};
    use hireflow_core::{ChunkId, IdentityId};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn test_document(user_id: &UserId) -> Document {
        let now = Utc::now();
        Document {
            document_id: DocumentId::generate(),
            user_id: *user_id,
            category: DocumentCategory::Resume,
            original_name: "cv.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 1024,
            storage_provider: "local".to_string(),
            storage_path: "u/cv.pdf".to_string(),
            public_url: "http://localhost/files/u/cv.pdf".to_string(),
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            chunk_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_chunk(document: &Document, index: u32) -> DocumentChunk {
        DocumentChunk {
            chunk_id: ChunkId::generate(),
            document_id: document.document_id,
            user_id: document.user_id,
            content: format!("chunk {index}"),
            embedding: Some(vec![1.0, 0.0]),
            metadata: ChunkMetadata::default(),
            chunk_index: index,
            created_at: Utc::now(),
        }
    }

    fn test_agent(user_id: &UserId, agent_type: AgentType) -> Agent {
        let now = Utc::now();
        Agent {
            agent_id: AgentId::generate(),
            user_id: *user_id,
            name: "Coach".to_string(),
            agent_type,
            status: AgentStatus::Active,
            configuration: AgentConfiguration::default(),
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_conversation(user_id: &UserId, agent_id: &AgentId) -> Conversation {
        let now = Utc::now();
        Conversation {
            conversation_id: ConversationId::generate(),
            agent_id: *agent_id,
            user_id: *user_id,
            title: None,
            context_policy: ContextPolicy::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_crud() {
        let (store, _dir) = create_test_store();
        let identity_id = IdentityId::generate();
        let user_id = UserId::from_identity(&identity_id);

        let user = User {
            user_id,
            identity_id,
            email: "test@example.com".to_string(),
            display_name: None,
            created_at: Utc::now(),
            last_login_at: None,
        };
        store.put_user(&user).unwrap();

        let retrieved = store.get_user(&user_id).unwrap().unwrap();
        assert_eq!(retrieved.email, "test@example.com");

        let other_id = UserId::from_bytes([2u8; 32]);
        assert!(store.get_user(&other_id).unwrap().is_none());
    }

    #[test]
    fn document_crud_and_user_index() {
        let (store, _dir) = create_test_store();
        let user1 = UserId::from_bytes([1u8; 32]);
        let user2 = UserId::from_bytes([2u8; 32]);

        let doc1 = test_document(&user1);
        let doc2 = test_document(&user1);
        let doc3 = test_document(&user2);
        for doc in [&doc1, &doc2, &doc3] {
            store.put_document(doc).unwrap();
        }

        assert_eq!(store.list_documents_by_user(&user1).unwrap().len(), 2);
        assert_eq!(store.list_documents_by_user(&user2).unwrap().len(), 1);

        let mut updated = doc1.clone();
        updated.processing_status = ProcessingStatus::Processed;
        store.put_document(&updated).unwrap();
        let retrieved = store.get_document(&doc1.document_id).unwrap().unwrap();
        assert_eq!(retrieved.processing_status, ProcessingStatus::Processed);

        store.delete_document(&doc1.document_id).unwrap();
        assert!(store.get_document(&doc1.document_id).unwrap().is_none());
        assert_eq!(store.list_documents_by_user(&user1).unwrap().len(), 1);

        assert!(matches!(
            store.delete_document(&doc1.document_id),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn chunks_listed_in_index_order_and_cascade_deleted() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::from_bytes([1u8; 32]);
        let document = test_document(&user_id);
        let other = test_document(&user_id);

        let chunks: Vec<_> = [2, 0, 1].into_iter().map(|i| test_chunk(&document, i)).collect();
        store.put_chunks(&chunks).unwrap();
        store.put_chunks(&[test_chunk(&other, 0)]).unwrap();

        let listed = store.list_chunks_by_document(&document.document_id).unwrap();
        let indexes: Vec<_> = listed.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(store.list_chunks_by_user(&user_id).unwrap().len(), 4);

        let removed = store
            .delete_chunks_by_document(&document.document_id)
            .unwrap();
        assert_eq!(removed, 3);
        assert!(store
            .list_chunks_by_document(&document.document_id)
            .unwrap()
            .is_empty());
        assert_eq!(store.list_chunks_by_user(&user_id).unwrap().len(), 1);
    }

    #[test]
    fn agents_by_user_and_type() {
        let (store, _dir) = create_test_store();
        let user1 = UserId::from_bytes([1u8; 32]);
        let user2 = UserId::from_bytes([2u8; 32]);

        let private = test_agent(&user1, AgentType::Private);
        let public = test_agent(&user2, AgentType::Public);
        store.put_agent(&private).unwrap();
        store.put_agent(&public).unwrap();

        assert_eq!(store.list_agents_by_user(&user1).unwrap().len(), 1);
        assert_eq!(store.list_agents_by_type(AgentType::Public).unwrap().len(), 1);

        // Publishing moves the agent between type indexes
        let mut published = private.clone();
        published.agent_type = AgentType::Public;
        store.put_agent(&published).unwrap();

        assert_eq!(store.list_agents_by_type(AgentType::Public).unwrap().len(), 2);
        assert!(store
            .list_agents_by_type(AgentType::Private)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn messages_ordered_and_status_updated() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::from_bytes([1u8; 32]);
        let agent = test_agent(&user_id, AgentType::Private);
        let conversation = test_conversation(&user_id, &agent.agent_id);
        store.put_conversation(&conversation).unwrap();

        let base = Utc::now();
        let mut ids = Vec::new();
        for (offset, role) in [(2, MessageRole::Assistant), (0, MessageRole::User), (1, MessageRole::Assistant)] {
            let message = ChatMessage {
                message_id: MessageId::generate(),
                conversation_id: conversation.conversation_id,
                role,
                content: format!("m{offset}"),
                status: MessageStatus::Completed,
                created_at: base + Duration::milliseconds(offset),
            };
            store.put_message(&message).unwrap();
            ids.push(message.message_id);
        }

        let listed = store.list_messages(&conversation.conversation_id).unwrap();
        let contents: Vec<_> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2"]);

        store
            .update_message_status(&ids[0], MessageStatus::Interrupted)
            .unwrap();
        let updated = store.get_message(&ids[0]).unwrap().unwrap();
        assert_eq!(updated.status, MessageStatus::Interrupted);
        assert_eq!(store.list_messages(&conversation.conversation_id).unwrap().len(), 3);

        assert!(matches!(
            store.update_message_status(&MessageId::generate(), MessageStatus::Interrupted),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_conversation_cascades_messages() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::from_bytes([1u8; 32]);
        let agent = test_agent(&user_id, AgentType::Private);
        let keep = test_conversation(&user_id, &agent.agent_id);
        let drop = test_conversation(&user_id, &agent.agent_id);
        store.put_conversation(&keep).unwrap();
        store.put_conversation(&drop).unwrap();

        let message = ChatMessage {
            message_id: MessageId::generate(),
            conversation_id: drop.conversation_id,
            role: MessageRole::User,
            content: "hello".to_string(),
            status: MessageStatus::Completed,
            created_at: Utc::now(),
        };
        store.put_message(&message).unwrap();

        assert_eq!(
            store.list_conversations(&user_id, &agent.agent_id).unwrap().len(),
            2
        );

        store.delete_conversation(&drop.conversation_id).unwrap();

        assert!(store.get_conversation(&drop.conversation_id).unwrap().is_none());
        assert!(store.get_message(&message.message_id).unwrap().is_none());
        let remaining = store.list_conversations(&user_id, &agent.agent_id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].conversation_id, keep.conversation_id);
    }

    #[test]
    fn profile_roundtrip() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::from_bytes([1u8; 32]);
        assert!(store.get_profile(&user_id).unwrap().is_none());

        let mut profile = Profile::empty(user_id);
        profile.summary = Some("Backend engineer".to_string());
        store.put_profile(&profile).unwrap();

        let retrieved = store.get_profile(&user_id).unwrap().unwrap();
        assert_eq!(retrieved.summary.as_deref(), Some("Backend engineer"));
    }
}
