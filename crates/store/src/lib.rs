//! Conversation persistence: an append/range-query interface and the
//! bounded prompt assembler built on top of it.

mod prompt;

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gateway_types::ConversationTurn;
use thiserror::Error;

pub use prompt::{AssembledPrompt, PromptBudget, PromptMessage, Role, assemble_prompt};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation store unavailable: {0}")]
    Unavailable(String),
}

/// Two operations, per spec: append a turn, and range-query recent turns
/// for a conversation. Query semantics: `started_at > since`, returned
/// newest-first, capped at 20 — mirrors the original's
/// `{conversationId, startTime > T}` sort-descending-limit-20 query.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, turn: ConversationTurn) -> Result<(), StoreError>;
    async fn recent(&self, conversation_id: &str, since: i64) -> Result<Vec<ConversationTurn>, StoreError>;
}

/// Process-local default store. Keeps turns grouped by conversation id in
/// insertion order; `recent` filters and re-sorts on read.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    turns: Mutex<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, turn: ConversationTurn) -> Result<(), StoreError> {
        let mut turns = self.turns.lock().expect("store mutex poisoned");
        turns.entry(turn.conversation_id.clone()).or_default().push(turn);
        Ok(())
    }

    async fn recent(&self, conversation_id: &str, since: i64) -> Result<Vec<ConversationTurn>, StoreError> {
        let turns = self.turns.lock().expect("store mutex poisoned");
        let mut matched: Vec<ConversationTurn> = turns
            .get(conversation_id)
            .into_iter()
            .flatten()
            .filter(|t| t.started_at > since)
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matched.truncate(20);
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(conversation_id: &str, prompt: &str, reply: &str, started_at: i64) -> ConversationTurn {
        ConversationTurn {
            conversation_id: conversation_id.to_string(),
            message_id: "mid".to_string(),
            prompt: prompt.to_string(),
            reply: reply.to_string(),
            model: "m1".to_string(),
            origin: "http://w1".to_string(),
            started_at,
        }
    }

    #[tokio::test]
    async fn recent_filters_by_since_and_caps_at_twenty() {
        let store = InMemoryConversationStore::new();
        for i in 0..25 {
            store.append(turn("c1", "p", "r", i)).await.unwrap();
        }
        let recent = store.recent("c1", 0).await.unwrap();
        assert_eq!(recent.len(), 20);
        // newest first
        assert_eq!(recent[0].started_at, 24);
    }

    #[tokio::test]
    async fn recent_excludes_turns_at_or_before_since() {
        let store = InMemoryConversationStore::new();
        store.append(turn("c1", "p", "r", 10)).await.unwrap();
        store.append(turn("c1", "p", "r", 20)).await.unwrap();
        let recent = store.recent("c1", 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].started_at, 20);
    }

    #[tokio::test]
    async fn recent_on_unknown_conversation_is_empty() {
        let store = InMemoryConversationStore::new();
        assert!(store.recent("nope", 0).await.unwrap().is_empty());
    }
}
