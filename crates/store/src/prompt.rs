//! Bounded conversation replay (§4.2): fetch recent turns, replay them as
//! alternating user/assistant turns, then append the current message.

use crate::ConversationStore;

#[derive(Debug, Clone, Copy)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// Per-route assembly limits: how far back to look, and the character
/// budget that governs trimming.
#[derive(Debug, Clone, Copy)]
pub struct PromptBudget {
    pub suspend_window_secs: i64,
    pub max_chars: usize,
}

impl PromptBudget {
    /// §4.2: 20 minutes / 2048 chars for the hosted route.
    pub const HOSTED: PromptBudget = PromptBudget {
        suspend_window_secs: 20 * 60,
        max_chars: 2048,
    };

    /// §4.2: 60 minutes for the worker route; 2048 chars, or 20480 for a
    /// long-context model (selected by the caller via `long_context`).
    pub const WORKER: PromptBudget = PromptBudget {
        suspend_window_secs: 60 * 60,
        max_chars: 2048,
    };

    pub fn long_context(mut self) -> Self {
        self.max_chars = 20480;
        self
    }
}

/// The assembled replay: history pairs (oldest first, trimmed to budget)
/// plus the current user message, kept separate so each upstream wire
/// format can shape them as it needs (role/content messages for the
/// hosted adapter, a `history[][]` array for the worker adapter).
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub history: Vec<(String, String)>,
    pub current_message: String,
}

impl AssembledPrompt {
    pub fn as_chat_messages(&self) -> Vec<PromptMessage> {
        let mut messages = Vec::with_capacity(self.history.len() * 2 + 1);
        for (prompt, reply) in &self.history {
            messages.push(PromptMessage {
                role: Role::User,
                content: prompt.clone(),
            });
            messages.push(PromptMessage {
                role: Role::Assistant,
                content: reply.clone(),
            });
        }
        messages.push(PromptMessage {
            role: Role::User,
            content: self.current_message.clone(),
        });
        messages
    }
}

/// Non-fatal on store failure: an empty history is substituted and only
/// the current turn is replayed.
pub async fn assemble_prompt(
    store: &dyn ConversationStore,
    conversation_id: &str,
    current_message: &str,
    now: i64,
    budget: &PromptBudget,
) -> AssembledPrompt {
    let turns = if conversation_id.is_empty() {
        Vec::new()
    } else {
        match store.recent(conversation_id, now - budget.suspend_window_secs).await {
            Ok(turns) => turns,
            Err(err) => {
                tracing::warn!(conversation_id, error = %err, "failed to load conversation history, replaying current turn only");
                Vec::new()
            }
        }
    };

    // `recent` returns newest-first; replay wants chronological order.
    let mut pairs: Vec<(String, String)> = turns.into_iter().rev().map(|t| (t.prompt, t.reply)).collect();

    while pairs.len() > 1 {
        let total: usize = pairs.iter().map(|(p, r)| p.chars().count() + r.chars().count()).sum();
        if total <= budget.max_chars {
            break;
        }
        pairs.remove(0);
    }

    AssembledPrompt {
        history: pairs,
        current_message: current_message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryConversationStore;
    use gateway_types::ConversationTurn;

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
    async fn empty_conversation_yields_only_current_message() {
        let store = InMemoryConversationStore::new();
        let assembled = assemble_prompt(&store, "", "hello", 1_000, &PromptBudget::HOSTED).await;
        assert!(assembled.history.is_empty());
        assert_eq!(assembled.current_message, "hello");
    }

    #[tokio::test]
    async fn replays_history_in_chronological_order() {
        let store = InMemoryConversationStore::new();
        store.append(turn("c1", "p1", "r1", 10)).await.unwrap();
        store.append(turn("c1", "p2", "r2", 20)).await.unwrap();
        let assembled = assemble_prompt(&store, "c1", "p3", 100, &PromptBudget::HOSTED).await;
        assert_eq!(
            assembled.history,
            vec![("p1".to_string(), "r1".to_string()), ("p2".to_string(), "r2".to_string())]
        );
        assert_eq!(assembled.current_message, "p3");
    }

    #[tokio::test]
    async fn drops_oldest_pairs_until_budget_fits() {
        let store = InMemoryConversationStore::new();
        let budget = PromptBudget {
            suspend_window_secs: 60 * 60,
            max_chars: 20,
        };
        store.append(turn("c1", "aaaaa", "bbbbb", 10)).await.unwrap();
        store.append(turn("c1", "ccccc", "ddddd", 20)).await.unwrap();
        store.append(turn("c1", "fffff", "ggggg", 30)).await.unwrap();
        // The current turn's length never enters the trim sum: all three
        // pairs sum to 30, over budget, so the oldest is dropped; the
        // remaining two pairs sum to exactly 20 and fit regardless of how
        // long the (here, 1-char) current message is.
        let assembled = assemble_prompt(&store, "c1", "e", 100, &budget).await;
        assert_eq!(
            assembled.history,
            vec![("ccccc".to_string(), "ddddd".to_string()), ("fffff".to_string(), "ggggg".to_string())]
        );
    }

    #[tokio::test]
    async fn current_turn_is_always_included_regardless_of_length() {
        let store = InMemoryConversationStore::new();
        let long_message = "x".repeat(5000);
        let assembled = assemble_prompt(&store, "", &long_message, 1_000, &PromptBudget::HOSTED).await;
        assert_eq!(assembled.current_message, long_message);
    }

    #[test]
    fn as_chat_messages_alternates_user_and_assistant() {
        let assembled = AssembledPrompt {
            history: vec![("p1".to_string(), "r1".to_string())],
            current_message: "p2".to_string(),
        };
        let messages = assembled.as_chat_messages();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0].role, Role::User));
        assert!(matches!(messages[1].role, Role::Assistant));
        assert!(matches!(messages[2].role, Role::User));
    }
}
