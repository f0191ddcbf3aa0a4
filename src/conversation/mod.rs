//! Conversation history shared across grounded-answer turns.
//!
//! Each conversation is addressed by an id and guarded by its own async mutex,
//! so a turn can hold its conversation from snapshot through append while turns
//! in other conversations proceed. The number of conversations held in memory
//! is bounded.

use crate::completion::Message;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Conversation used when a caller does not name one.
pub const DEFAULT_CONVERSATION: &str = "default";

/// Ordered user/assistant history for a single conversation.
///
/// System messages are injected per call and never stored here.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    /// Maximum stored messages (0 = unbounded).
    max_messages: usize,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state that drops its oldest turns beyond `max_messages`.
    pub fn with_limit(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages,
        }
    }

    /// Append a completed turn, user message first.
    pub fn append_turn(&mut self, user: Message, assistant: Message) {
        self.messages.push(user);
        self.messages.push(assistant);

        if self.max_messages > 0 && self.messages.len() > self.max_messages {
            // Drop whole turns so the history never starts with an orphaned reply.
            let excess = self.messages.len() - self.max_messages;
            let drop = (excess + excess % 2).min(self.messages.len());
            self.messages.drain(..drop);
        }
    }

    /// Copy of the current history.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A conversation and the tick of its last use.
#[derive(Debug)]
struct Slot {
    state: Arc<Mutex<ConversationState>>,
    last_used: AtomicU64,
}

/// Keyed collection of conversations.
///
/// Clearing a conversation forgets its id. Once `max_conversations` ids are
/// held, the least recently used conversation that no turn is holding is
/// evicted to make room for a new one.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Slot>>,
    max_messages: usize,
    max_conversations: usize,
    clock: AtomicU64,
}

impl ConversationStore {
    /// Create a store whose conversations keep at most `max_messages` (0 = unbounded),
    /// holding at most `max_conversations` ids (0 = unbounded).
    pub fn new(max_messages: usize, max_conversations: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_messages,
            max_conversations,
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the handle for `id`, creating an empty conversation on first use.
    pub fn handle(&self, id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(slot) = self
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            slot.last_used.store(self.tick(), Ordering::Relaxed);
            return slot.state.clone();
        }

        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if !conversations.contains_key(id)
            && self.max_conversations > 0
            && conversations.len() >= self.max_conversations
        {
            evict_idle(&mut conversations);
        }

        let slot = conversations.entry(id.to_string()).or_insert_with(|| Slot {
            state: Arc::new(Mutex::new(ConversationState::with_limit(self.max_messages))),
            last_used: AtomicU64::new(0),
        });
        slot.last_used.store(self.tick(), Ordering::Relaxed);
        slot.state.clone()
    }

    fn existing(&self, id: &str) -> Option<Arc<Mutex<ConversationState>>> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|slot| slot.state.clone())
    }

    /// History of `id`; empty when the conversation is unknown.
    pub async fn snapshot(&self, id: &str) -> Vec<Message> {
        match self.existing(id) {
            Some(handle) => handle.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    /// Clear the history of `id` and forget the id. Idempotent.
    ///
    /// Waits for a turn in progress on `id` to finish first.
    pub async fn clear(&self, id: &str) {
        let Some(handle) = self.existing(id) else {
            return;
        };
        let mut state = handle.lock().await;
        state.clear();

        let mut conversations = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if conversations
            .get(id)
            .is_some_and(|slot| Arc::ptr_eq(&slot.state, &handle))
        {
            conversations.remove(id);
        }
    }

    /// Number of conversations currently held.
    pub fn len(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

/// Drop the least recently used conversation that no caller holds a handle to.
fn evict_idle(conversations: &mut HashMap<String, Slot>) {
    let idle = conversations
        .iter()
        .filter(|(_, slot)| Arc::strong_count(&slot.state) == 1)
        .min_by_key(|(_, slot)| slot.last_used.load(Ordering::Relaxed))
        .map(|(id, _)| id.clone());

    match idle {
        Some(id) => {
            conversations.remove(&id);
            debug!("Evicted idle conversation {}", id);
        }
        None => warn!(
            "All {} conversations are in use; holding one more",
            conversations.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Role;

    #[test]
    fn test_append_turn_order() {
        let mut state = ConversationState::new();
        state.append_turn(Message::user("q1"), Message::assistant("a1"));
        state.append_turn(Message::user("q2"), Message::assistant("a2"));

        let history = state.snapshot();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], Message::user("q1"));
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[3], Message::assistant("a2"));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut state = ConversationState::new();
        state.append_turn(Message::user("q"), Message::assistant("a"));

        let mut copy = state.snapshot();
        copy.clear();
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut state = ConversationState::new();
        state.clear();
        assert!(state.is_empty());

        state.append_turn(Message::user("q"), Message::assistant("a"));
        state.clear();
        state.clear();
        assert!(state.is_empty());
    }

    #[test]
    fn test_limit_drops_oldest_turns() {
        let mut state = ConversationState::with_limit(4);
        for i in 0..3 {
            state.append_turn(
                Message::user(format!("q{}", i)),
                Message::assistant(format!("a{}", i)),
            );
        }

        let history = state.snapshot();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], Message::user("q1"));
        assert_eq!(history[3], Message::assistant("a2"));
    }

    #[test]
    fn test_odd_limit_keeps_pairs_aligned() {
        let mut state = ConversationState::with_limit(3);
        state.append_turn(Message::user("q0"), Message::assistant("a0"));
        state.append_turn(Message::user("q1"), Message::assistant("a1"));

        let history = state.snapshot();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_store_isolates_conversations() {
        let store = ConversationStore::new(0, 0);

        store
            .handle("alice")
            .lock()
            .await
            .append_turn(Message::user("q"), Message::assistant("a"));

        assert_eq!(store.snapshot("alice").await.len(), 2);
        assert!(store.snapshot("bob").await.is_empty());
        assert_eq!(store.ids(), vec!["alice".to_string()]);

        store.clear("alice").await;
        store.clear("bob").await;
        assert!(store.snapshot("alice").await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_forgets_conversation() {
        let store = ConversationStore::new(0, 0);
        for i in 0..5 {
            let id = format!("caller-{}", i);
            store
                .handle(&id)
                .lock()
                .await
                .append_turn(Message::user("q"), Message::assistant("a"));
            store.clear(&id).await;
        }

        assert!(store.ids().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clear_waits_for_turn_in_progress() {
        let store = Arc::new(ConversationStore::new(0, 0));
        let handle = store.handle("alice");
        let mut turn = handle.lock().await;

        let clearing = tokio::spawn({
            let store = store.clone();
            async move { store.clear("alice").await }
        });
        tokio::task::yield_now().await;

        turn.append_turn(Message::user("q"), Message::assistant("a"));
        drop(turn);
        clearing.await.unwrap();

        assert!(handle.lock().await.is_empty());
        assert!(store.ids().is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let store = ConversationStore::new(0, 2);
        drop(store.handle("a"));
        drop(store.handle("b"));
        drop(store.handle("a"));
        drop(store.handle("c"));

        assert_eq!(store.ids(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_capacity_never_evicts_held_conversations() {
        let store = ConversationStore::new(0, 1);
        let held = store.handle("a");
        let _other = store.handle("b");

        assert_eq!(store.len(), 2);
        assert!(Arc::ptr_eq(&held, &store.handle("a")));
    }

    #[tokio::test]
    async fn test_handle_is_shared() {
        let store = ConversationStore::new(0, 0);
        let a = store.handle(DEFAULT_CONVERSATION);
        let b = store.handle(DEFAULT_CONVERSATION);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
