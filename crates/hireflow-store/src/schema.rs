//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Primary document records, keyed by `document_id`.
    pub const DOCUMENTS: &str = "documents";

    /// Index: documents by user, keyed by `user_id || document_id`.
    pub const DOCUMENTS_BY_USER: &str = "documents_by_user";

    /// Primary chunk records, keyed by `chunk_id`.
    pub const CHUNKS: &str = "chunks";

    /// Index: chunks by document, keyed by `document_id || chunk_index || chunk_id`.
    pub const CHUNKS_BY_DOCUMENT: &str = "chunks_by_document";

    /// Index: chunks by user, keyed by `user_id || chunk_id`.
    pub const CHUNKS_BY_USER: &str = "chunks_by_user";

    /// Primary agent records, keyed by `agent_id`.
    pub const AGENTS: &str = "agents";

    /// Index: agents by user, keyed by `user_id || agent_id`.
    pub const AGENTS_BY_USER: &str = "agents_by_user";

    /// Index: agents by type, keyed by `type || agent_id`.
    pub const AGENTS_BY_TYPE: &str = "agents_by_type";

    /// Primary conversation records, keyed by `conversation_id`.
    pub const CONVERSATIONS: &str = "conversations";

    /// Index: conversations by owner and agent, keyed by `user_id || agent_id || conversation_id`.
    pub const CONVERSATIONS_BY_USER_AGENT: &str = "conversations_by_user_agent";

    /// Primary message records, keyed by `message_id`.
    pub const MESSAGES: &str = "messages";

    /// Index: messages by conversation, keyed by `conversation_id || created_micros || message_id`.
    pub const MESSAGES_BY_CONVERSATION: &str = "messages_by_conversation";

    /// Candidate profiles, keyed by `user_id`.
    pub const PROFILES: &str = "profiles";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::DOCUMENTS,
        cf::DOCUMENTS_BY_USER,
        cf::CHUNKS,
        cf::CHUNKS_BY_DOCUMENT,
        cf::CHUNKS_BY_USER,
        cf::AGENTS,
        cf::AGENTS_BY_USER,
        cf::AGENTS_BY_TYPE,
        cf::CONVERSATIONS,
        cf::CONVERSATIONS_BY_USER_AGENT,
        cf::MESSAGES,
        cf::MESSAGES_BY_CONVERSATION,
        cf::PROFILES,
    ]
}
