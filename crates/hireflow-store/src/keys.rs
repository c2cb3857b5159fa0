//! Key encoding utilities for `RocksDB`.
//!
//! Index keys are concatenations of fixed-width IDs so that prefix scans
//! return every record belonging to the leading ID. The trailing 16 bytes of
//! every index key are the UUID of the indexed record.

use chrono::{DateTime, Utc};
use hireflow_core::{AgentId, ChunkId, ConversationId, DocumentId, MessageId, UserId};

/// Width of a UUID-based ID.
const UUID_LEN: usize = 16;

/// Concatenate key parts into one buffer.
fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut key = Vec::with_capacity(len);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Read the trailing UUID bytes of an index key.
///
/// Returns `None` if the key is shorter than a UUID.
#[must_use]
pub fn trailing_uuid(key: &[u8]) -> Option<[u8; 16]> {
    let start = key.len().checked_sub(UUID_LEN)?;
    key[start..].try_into().ok()
}

/// Encode a user key (just the user ID bytes).
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Encode a user prefix for scanning any per-user index.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Encode a user-document index key: `user_id || document_id`.
#[must_use]
pub fn user_document_key(user_id: &UserId, document_id: &DocumentId) -> Vec<u8> {
    concat(&[user_id.as_bytes(), document_id.as_bytes()])
}

/// Encode a document-chunk index key: `document_id || chunk_index || chunk_id`.
///
/// The index is big-endian so a prefix scan yields chunks in document order.
#[must_use]
pub fn document_chunk_key(
    document_id: &DocumentId,
    chunk_index: u32,
    chunk_id: &ChunkId,
) -> Vec<u8> {
    concat(&[
        document_id.as_bytes(),
        &chunk_index.to_be_bytes(),
        chunk_id.as_bytes(),
    ])
}

/// Encode a user-chunk index key: `user_id || chunk_id`.
#[must_use]
pub fn user_chunk_key(user_id: &UserId, chunk_id: &ChunkId) -> Vec<u8> {
    concat(&[user_id.as_bytes(), chunk_id.as_bytes()])
}

/// Encode a user-agent index key: `user_id || agent_id`.
#[must_use]
pub fn user_agent_key(user_id: &UserId, agent_id: &AgentId) -> Vec<u8> {
    concat(&[user_id.as_bytes(), agent_id.as_bytes()])
}

/// Encode a type-agent index key: `type || agent_id`.
#[must_use]
pub fn type_agent_key(agent_type: u8, agent_id: &AgentId) -> Vec<u8> {
    concat(&[&[agent_type], agent_id.as_bytes()])
}

/// Encode a user-agent-conversation index key: `user_id || agent_id || conversation_id`.
#[must_use]
pub fn user_agent_conversation_key(
    user_id: &UserId,
    agent_id: &AgentId,
    conversation_id: &ConversationId,
) -> Vec<u8> {
    concat(&[
        user_id.as_bytes(),
        agent_id.as_bytes(),
        conversation_id.as_bytes(),
    ])
}

/// Encode a conversation-message index key: `conversation_id || created_micros || message_id`.
///
/// Timestamps before the epoch sort first.
#[must_use]
pub fn conversation_message_key(
    conversation_id: &ConversationId,
    created_at: &DateTime<Utc>,
    message_id: &MessageId,
) -> Vec<u8> {
    let micros = u64::try_from(created_at.timestamp_micros()).unwrap_or(0);
    concat(&[
        conversation_id.as_bytes(),
        &micros.to_be_bytes(),
        message_id.as_bytes(),
    ])
}
