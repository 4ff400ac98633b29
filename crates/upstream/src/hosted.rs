//! The hosted-API variant: a pool of OpenAI-compatible credentials, each
//! with a plain atomic `available` bit (§3 "Hosted client"; §5 "the
//! `available` flag is a plain atomic read/write").

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use gateway_store::{ConversationStore, PromptBudget, Role, assemble_prompt};
use gateway_types::{Answer, DEFAULT_HOSTED_MODEL, HOSTED_MODEL_ID, Question, RATE_LIMIT_REPLY};
use serde::{Deserialize, Serialize};

use crate::{UpstreamError, UpstreamOutcome, UpstreamResult, resolve_conversation_id};

const HOSTED_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const HOSTED_TIMEOUT: Duration = Duration::from_secs(60);

/// One hosted credential. `available` is toggled by the dispatcher in
/// response to rate-limit signals (§9 open question — resolved as
/// mark-unavailable-with-cool-off).
pub struct HostedClient {
    pub credential: String,
    available: AtomicBool,
    http: reqwest::Client,
    endpoint: String,
}

impl HostedClient {
    pub fn new(credential: impl Into<String>) -> Arc<Self> {
        Self::new_with_endpoint(credential, HOSTED_ENDPOINT)
    }

    /// Same as [`Self::new`] but against an explicit endpoint — the seam
    /// tests use to point the adapter at a mock server instead of the real
    /// hosted provider.
    pub fn new_with_endpoint(credential: impl Into<String>, endpoint: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            credential: credential.into(),
            available: AtomicBool::new(true),
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        })
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Mark the credential unavailable for `cooloff`, then restore it. The
    /// cool-off runs on a detached task so the caller's retry path never
    /// blocks waiting for it.
    pub fn mark_rate_limited(self: &Arc<Self>, cooloff: Duration) {
        self.set_available(false);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(cooloff).await;
            this.set_available(true);
        });
    }

    pub async fn get_answer(&self, store: &dyn ConversationStore, question: &Question, now: i64) -> UpstreamResult {
        let assembled = assemble_prompt(store, &question.conversation_id, &question.message, now, &PromptBudget::HOSTED).await;

        let messages: Vec<ChatMessageWire> = assembled
            .as_chat_messages()
            .into_iter()
            .map(|m| ChatMessageWire {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: m.content,
            })
            .collect();

        let request = ChatCompletionRequest {
            model: HOSTED_MODEL_ID,
            messages,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.credential)
            .timeout(HOSTED_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(UpstreamOutcome::RateLimited(Answer {
                text: RATE_LIMIT_REPLY.to_string(),
                message_id: question.message_id.clone(),
                conversation_id: String::new(),
                model: DEFAULT_HOSTED_MODEL.to_string(),
                origin: self.credential.clone(),
            }));
        }

        if !response.status().is_success() {
            return Err(UpstreamError::Decode(format!("hosted call returned status {}", response.status())));
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(UpstreamError::NoAnswerChoice)?;

        Ok(UpstreamOutcome::Answer(Answer {
            text: content,
            message_id: if question.message_id.is_empty() {
                uuid::Uuid::new_v4().to_string()
            } else {
                question.message_id.clone()
            },
            conversation_id: resolve_conversation_id(&question.conversation_id),
            model: DEFAULT_HOSTED_MODEL.to_string(),
            origin: self.credential.clone(),
        }))
    }
}

/// Immutable post-init pool, indexed in insertion order (§3 "Hosted pool").
pub struct HostedPool {
    clients: Vec<Arc<HostedClient>>,
}

impl HostedPool {
    pub fn new(credentials: impl IntoIterator<Item = String>) -> Self {
        Self {
            clients: credentials.into_iter().map(HostedClient::new).collect(),
        }
    }

    /// Same as [`Self::new`] but every client in the pool talks to
    /// `endpoint` instead of the real hosted provider.
    pub fn new_with_endpoint(credentials: impl IntoIterator<Item = String>, endpoint: &str) -> Self {
        Self {
            clients: credentials
                .into_iter()
                .map(|credential| HostedClient::new_with_endpoint(credential, endpoint))
                .collect(),
        }
    }

    pub fn by_credential(&self, credential: &str) -> Option<Arc<HostedClient>> {
        self.clients.iter().find(|c| c.credential == credential).cloned()
    }

    /// First-available scan, restart-at-head every call (§4.5.2 "there is
    /// no global queueing across credentials").
    pub fn first_available(&self) -> Option<Arc<HostedClient>> {
        self.clients.iter().find(|c| c.is_available()).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[derive(Serialize)]
struct ChatMessageWire {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: &'static str,
    messages: Vec<ChatMessageWire>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_available_skips_unavailable_credentials() {
        let pool = HostedPool::new(["sk-a".to_string(), "sk-b".to_string()]);
        pool.by_credential("sk-a").unwrap().set_available(false);
        let chosen = pool.first_available().unwrap();
        assert_eq!(chosen.credential, "sk-b");
    }

    #[test]
    fn empty_pool_has_no_available_credential() {
        let pool = HostedPool::new(Vec::<String>::new());
        assert!(pool.first_available().is_none());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_cooloff_restores_availability() {
        let client = HostedClient::new("sk-a");
        client.mark_rate_limited(Duration::from_millis(20));
        assert!(!client.is_available());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(client.is_available());
    }
}
