//! Shared application state, handed to every handler via axum's `State`
//! extractor.

use std::sync::Arc;

use gateway_dispatch::Engine;
use gateway_registry::WorkerRegistry;
use gateway_sensitive::SensitiveFilter;
use gateway_session::SessionStore;
use gateway_store::ConversationStore;

pub struct AppState {
    pub engine: Engine,
    pub registry: Arc<WorkerRegistry>,
    pub store: Arc<dyn ConversationStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub sensitive: Arc<dyn SensitiveFilter>,
    /// Used for registry-adjacent calls outside the dispatch core, e.g.
    /// spawning a new worker's health monitor on registration.
    pub http: reqwest::Client,
}
