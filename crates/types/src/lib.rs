//! Shared data model for the chat-completion gateway.
//!
//! Every other crate in the workspace depends on this one; it carries no
//! logic beyond simple constructors, so it stays dependency-light and
//! compiles fast.

use serde::{Deserialize, Serialize};

/// The model tag that routes to the hosted pool rather than a worker bucket.
pub const DEFAULT_HOSTED_MODEL: &str = "gpt";

/// Model identifier the hosted adapter sends upstream and stamps onto answers.
pub const HOSTED_MODEL_ID: &str = "gpt-3.5-turbo";

/// Canned reply returned when a hosted credential is rate-limited.
pub const RATE_LIMIT_REPLY: &str = "AI模型正忙，请稍后重试";

/// Canned refusal returned when the sensitive-word filter matches.
pub const SENSITIVE_REPLY: &str = "作为一个人工智能，我无法对您上面提出的问题给出符合规范的、令您满意的回答，非常抱歉带给您糟糕的体验。感谢您提出的问题，我们后续会对此进行优化，以便能更好的为您服务。";

/// Literal reply text for the `"clear"` sentinel command.
pub const CLEAR_REPLY: &str = "Cleared";

/// Sentinel user message that clears session continuity instead of dispatching.
pub const CLEAR_COMMAND: &str = "clear";

/// A question admitted into the dispatch engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    pub message: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub conversation_id: String,
    /// Hosted credential hint — an API key the dispatcher should try first.
    #[serde(default)]
    pub credential: String,
    /// Empty means "default hosted"; otherwise must name a registered model.
    #[serde(default)]
    pub model: String,
}

impl Question {
    pub fn is_worker_routed(&self, known_models: &[String]) -> bool {
        !self.model.is_empty() && known_models.iter().any(|m| m == &self.model)
    }
}

/// The result of a dispatch attempt, whether it succeeded or not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub message_id: String,
    pub conversation_id: String,
    pub model: String,
    /// The credential or worker URL that produced the answer.
    pub origin: String,
}

impl Answer {
    pub fn is_empty_reply(&self) -> bool {
        self.text.is_empty()
    }
}

/// One persisted turn of a conversation, ordered by `started_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub conversation_id: String,
    pub message_id: String,
    pub prompt: String,
    pub reply: String,
    pub model: String,
    pub origin: String,
    /// Unix seconds.
    pub started_at: i64,
}

/// Continuity carried between a user's requests via the session store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserContinuity {
    pub message_id: String,
    pub conversation_id: String,
    pub origin: String,
    pub model: String,
    /// Unix seconds of the last turn that touched this continuity.
    pub last_time: i64,
}

impl UserContinuity {
    pub fn is_empty(&self) -> bool {
        self.message_id.is_empty()
            && self.conversation_id.is_empty()
            && self.origin.is_empty()
            && self.model.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_routes_to_worker_only_for_known_models() {
        let known = vec!["m1".to_string(), "m2".to_string()];
        let mut q = Question {
            message: "hi".into(),
            model: "m1".into(),
            ..Default::default()
        };
        assert!(q.is_worker_routed(&known));
        q.model = "nope".into();
        assert!(!q.is_worker_routed(&known));
        q.model.clear();
        assert!(!q.is_worker_routed(&known));
    }

    #[test]
    fn fresh_continuity_is_empty() {
        assert!(UserContinuity::default().is_empty());
    }
}
