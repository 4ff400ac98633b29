//! Upstream adapters (§4.1): a hosted-API client keyed by credential, and
//! a self-hosted worker client keyed by URL and model tag. Both expose the
//! same shape of call — given a question, produce an answer or an error —
//! but a rate-limited hosted call produces both a canned reply and a
//! failure signal, so the return type models that explicitly rather than
//! forcing it through a plain `Result`.

mod hosted;
mod worker;

use thiserror::Error;

pub use hosted::{HostedClient, HostedPool};
pub use worker::call_worker;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no answer choice returned")]
    NoAnswerChoice,
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("decode upstream reply: {0}")]
    Decode(String),
}

/// Outcome of a call that succeeded at the transport level. `RateLimited`
/// carries the canned busy reply (§4.1) alongside a failure signal for the
/// caller's retry/cool-off policy — the original adapter's "returns both a
/// successful reply and a non-nil error" behavior made explicit.
#[derive(Debug, Clone)]
pub enum UpstreamOutcome {
    Answer(gateway_types::Answer),
    RateLimited(gateway_types::Answer),
}

pub type UpstreamResult = Result<UpstreamOutcome, UpstreamError>;

fn resolve_conversation_id(existing: &str) -> String {
    if existing.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        existing.to_string()
    }
}
