//! Library surface for the gateway's HTTP-facing coordinator. `main.rs`
//! (the `gatewayd` binary) is a thin CLI/bootstrap wrapper around
//! [`build_state`] and [`app::router`]; integration tests in `tests/`
//! exercise the router directly against the same wiring.

pub mod app;
pub mod cookies;
pub mod envelope;
pub mod handlers;
pub mod state;

use std::collections::HashSet;
use std::sync::Arc;

use gateway_config::GatewayConfig;
use gateway_dispatch::{DispatchContext, Engine};
use gateway_registry::{WorkerRegistry, spawn_health_monitor};
use gateway_sensitive::{AhoCorasickFilter, NoopFilter, SensitiveFilter};
use gateway_session::InMemorySessionStore;
use gateway_store::InMemoryConversationStore;
use gateway_upstream::HostedPool;

use crate::state::AppState;

/// Worker model names that get the 10x prompt budget (§4.2 supplement).
/// The original hardcodes a single name; kept configurable in code until
/// the YAML schema grows a key for it.
pub const LONG_CONTEXT_MODELS: &[&str] = &["self-driving-v3"];

/// Builds the shared application state described by `config`: the worker
/// registry (pre-declared and pre-registered from `bs_model`), the hosted
/// credential pool, the sensitive-word filter, and the dispatch engine.
///
/// `hosted_endpoint_override` lets callers (tests) point the hosted
/// adapter at a mock server instead of the real provider; production
/// startup passes `None` to use the real hosted endpoint.
pub async fn build_state(config: &GatewayConfig, hosted_endpoint_override: Option<&str>) -> anyhow::Result<Arc<AppState>> {
    let registry = Arc::new(WorkerRegistry::new());
    let http = reqwest::Client::new();

    for model in config.declared_models() {
        registry.declare_model(&model).await;
    }
    for (model, urls) in &config.bs_model {
        for url in urls {
            match registry.register(model, url).await {
                Ok(handle) => {
                    spawn_health_monitor(handle, http.clone());
                }
                Err(err) => {
                    tracing::warn!(model = %model, url = %url, error = %err, "skipping pre-declared worker");
                }
            }
        }
    }

    let hosted_pool = Arc::new(match hosted_endpoint_override {
        Some(endpoint) => HostedPool::new_with_endpoint(config.openai_key.clone(), endpoint),
        None => HostedPool::new(config.openai_key.clone()),
    });

    let sensitive: Arc<dyn SensitiveFilter> = if config.sensitive.is_empty() {
        Arc::new(NoopFilter)
    } else {
        Arc::new(AhoCorasickFilter::load(&config.sensitive)?)
    };

    // Conversation persistence is an open seam (SPEC_FULL §2): `mongo_uri`
    // is accepted for forward compatibility with a real backing store, but
    // the in-memory implementation is what actually backs `ConversationStore`
    // today.
    let store: Arc<dyn gateway_store::ConversationStore> = Arc::new(InMemoryConversationStore::new());
    let sessions: Arc<dyn gateway_session::SessionStore> = Arc::new(InMemorySessionStore::new());

    let long_context_models: HashSet<String> = LONG_CONTEXT_MODELS.iter().map(|s| s.to_string()).collect();

    let ctx = DispatchContext {
        registry: Arc::clone(&registry),
        hosted_pool,
        store: Arc::clone(&store),
        http: http.clone(),
        max_retry: 0,
        long_context_models,
    };
    let engine = Engine::new(ctx, config.max_pending);

    Ok(Arc::new(AppState {
        engine,
        registry,
        store,
        sessions,
        sensitive,
        http,
    }))
}
