use std::collections::HashSet;
use std::sync::Arc;

use gateway_registry::WorkerRegistry;
use gateway_store::ConversationStore;
use gateway_upstream::HostedPool;

/// Everything a worker coroutine needs to route and attempt one question.
/// Shared read-only across every in-flight attempt.
pub struct DispatchContext {
    pub registry: Arc<WorkerRegistry>,
    pub hosted_pool: Arc<HostedPool>,
    pub store: Arc<dyn ConversationStore>,
    pub http: reqwest::Client,
    /// §4.5 "MaxRetry is 0 (one attempt); the loop structure exists so the
    /// value is configurable."
    pub max_retry: u32,
    /// Worker model names that get the 10x prompt budget (§4.2 supplement).
    pub long_context_models: HashSet<String>,
}

impl DispatchContext {
    pub fn is_long_context(&self, model_name: &str) -> bool {
        self.long_context_models.contains(model_name)
    }
}
