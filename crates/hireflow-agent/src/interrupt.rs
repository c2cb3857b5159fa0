//! Interrupting a running chat turn.
//!
//! Each running turn registers itself in the [`InterruptRegistry`] under its
//! conversation and holds the returned [`InterruptHandle`] until it ends.
//! Signalling the conversation wakes the turn, which drops its in-flight
//! model request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hireflow_core::{ConversationId, MessageId, UserId};
use hireflow_store::{MessageStatus, Store};
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::{AgentError, Result};

struct Slot {
    turn: u64,
    signal: watch::Sender<bool>,
}

#[derive(Default)]
struct Inner {
    slots: Mutex<HashMap<ConversationId, Slot>>,
    next_turn: AtomicU64,
}

/// Active turns, keyed by conversation.
#[derive(Clone, Default)]
pub struct InterruptRegistry {
    inner: Arc<Inner>,
}

impl InterruptRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a turn for `conversation_id`.
    ///
    /// A newer turn on the same conversation replaces the older one's slot.
    #[must_use]
    pub fn register(&self, conversation_id: ConversationId) -> InterruptHandle {
        let turn = self.inner.next_turn.fetch_add(1, Ordering::Relaxed);
        let (signal, receiver) = watch::channel(false);
        self.inner
            .slots
            .lock()
            .insert(conversation_id, Slot { turn, signal });

        InterruptHandle {
            registry: self.clone(),
            conversation_id,
            turn,
            receiver,
        }
    }

    /// Signal the turn running on `conversation_id`.
    ///
    /// Returns false when no turn is running.
    pub fn signal(&self, conversation_id: &ConversationId) -> bool {
        self.inner
            .slots
            .lock()
            .get(conversation_id)
            .is_some_and(|slot| slot.signal.send(true).is_ok())
    }

    /// Returns true if a turn is registered for `conversation_id`.
    #[must_use]
    pub fn is_active(&self, conversation_id: &ConversationId) -> bool {
        self.inner.slots.lock().contains_key(conversation_id)
    }

    fn release(&self, conversation_id: &ConversationId, turn: u64) {
        let mut slots = self.inner.slots.lock();
        if slots.get(conversation_id).is_some_and(|slot| slot.turn == turn) {
            slots.remove(conversation_id);
        }
    }
}

/// A registered turn. Unregisters when dropped.
pub struct InterruptHandle {
    registry: InterruptRegistry,
    conversation_id: ConversationId,
    turn: u64,
    receiver: watch::Receiver<bool>,
}

impl InterruptHandle {
    /// Resolve once the turn is interrupted.
    ///
    /// Never resolves if the registry drops the slot without signalling.
    pub async fn interrupted(&mut self) {
        if self.receiver.wait_for(|signalled| *signalled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Returns true if the turn has been interrupted.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        *self.receiver.borrow()
    }
}

impl Drop for InterruptHandle {
    fn drop(&mut self) {
        self.registry.release(&self.conversation_id, self.turn);
    }
}

/// Use case: interrupt the turn running on a conversation.
pub struct Interrupt {
    store: Arc<dyn Store>,
    registry: InterruptRegistry,
}

impl Interrupt {
    /// Create the use case.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, registry: InterruptRegistry) -> Self {
        Self { store, registry }
    }

    /// Interrupt `conversation_id` and mark `message_id` interrupted.
    ///
    /// Returns whether a running turn was signalled. The message is marked
    /// even when no turn was running, provided it belongs to the conversation.
    ///
    /// # Errors
    ///
    /// Returns `ConversationNotFound` or `ConversationForbidden` if the
    /// conversation is missing or owned by someone else.
    pub fn execute(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
        message_id: Option<&MessageId>,
    ) -> Result<bool> {
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

        let signalled = self.registry.signal(conversation_id);

        if let Some(message_id) = message_id {
            let belongs = self
                .store
                .get_message(message_id)?
                .is_some_and(|m| m.conversation_id == *conversation_id);
            if belongs {
                self.store
                    .update_message_status(message_id, MessageStatus::Interrupted)?;
            }
        }

        tracing::info!(
            conversation_id = %conversation_id,
            signalled,
            "Interrupt requested"
        );
        Ok(signalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hireflow_core::AgentId;
    use hireflow_store::{ChatMessage, ContextPolicy, Conversation, MessageRole, RocksStore};
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (Interrupt, Arc<RocksStore>, InterruptRegistry, TempDir, UserId, Conversation) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let user_id = UserId::from_bytes([6u8; 32]);
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

        let registry = InterruptRegistry::new();
        let interrupt = Interrupt::new(store.clone(), registry.clone());
        (interrupt, store, registry, dir, user_id, conversation)
    }

    fn assistant_message(conversation_id: ConversationId) -> ChatMessage {
        ChatMessage {
            message_id: MessageId::generate(),
            conversation_id,
            role: MessageRole::Assistant,
            content: "partial".to_string(),
            status: MessageStatus::Completed,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn signal_wakes_registered_turn() {
        let registry = InterruptRegistry::new();
        let conversation_id = ConversationId::generate();
        let mut handle = registry.register(conversation_id);

        assert!(registry.signal(&conversation_id));
        tokio::time::timeout(Duration::from_secs(1), handle.interrupted())
            .await
            .unwrap();
        assert!(handle.is_interrupted());
    }

    #[test]
    fn signal_without_turn_is_noop() {
        let registry = InterruptRegistry::new();
        assert!(!registry.signal(&ConversationId::generate()));
    }

    #[test]
    fn dropping_old_handle_keeps_newer_turn() {
        let registry = InterruptRegistry::new();
        let conversation_id = ConversationId::generate();

        let first = registry.register(conversation_id);
        let second = registry.register(conversation_id);
        drop(first);
        assert!(registry.is_active(&conversation_id));

        drop(second);
        assert!(!registry.is_active(&conversation_id));
    }

    #[tokio::test]
    async fn marks_message_interrupted_without_running_turn() {
        let (interrupt, store, _registry, _dir, user_id, conversation) = setup();
        let message = assistant_message(conversation.conversation_id);
        store.put_message(&message).unwrap();

        let signalled = interrupt
            .execute(&user_id, &conversation.conversation_id, Some(&message.message_id))
            .unwrap();

        assert!(!signalled);
        let stored = store.get_message(&message.message_id).unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Interrupted);
    }

    #[tokio::test]
    async fn ignores_message_from_other_conversation() {
        let (interrupt, store, registry, _dir, user_id, conversation) = setup();
        let message = assistant_message(ConversationId::generate());
        store.put_message(&message).unwrap();
        let _turn = registry.register(conversation.conversation_id);

        let signalled = interrupt
            .execute(&user_id, &conversation.conversation_id, Some(&message.message_id))
            .unwrap();

        assert!(signalled);
        let stored = store.get_message(&message.message_id).unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Completed);
    }

    #[tokio::test]
    async fn rejects_missing_and_foreign_conversations() {
        let (interrupt, _store, _registry, _dir, user_id, conversation) = setup();

        let missing = interrupt.execute(&user_id, &ConversationId::generate(), None);
        assert!(matches!(missing, Err(AgentError::ConversationNotFound(_))));

        let stranger = UserId::from_bytes([7u8; 32]);
        let foreign = interrupt.execute(&stranger, &conversation.conversation_id, None);
        assert!(matches!(foreign, Err(AgentError::ConversationForbidden { .. })));
    }
}
