//! The self-hosted worker variant: legacy `{content, history, model}` wire
//! format over HTTP (§9 "two worker wire formats... the legacy form is the
//! active one").

use std::time::Duration;

use gateway_registry::{WorkerHandle, WorkerStatus};
use gateway_store::{ConversationStore, PromptBudget, assemble_prompt};
use gateway_types::{Answer, Question};
use serde::{Deserialize, Serialize};

use crate::{UpstreamError, UpstreamOutcome, UpstreamResult, resolve_conversation_id};

const WORKER_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Serialize)]
struct WorkerRequestWire {
    content: String,
    history: Vec<(String, String)>,
    model: String,
}

#[derive(Deserialize)]
struct WorkerReplyWire {
    #[serde(default)]
    response: String,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    #[allow(dead_code)]
    ret: i32,
}

/// Calls `handle`, setting its status to `Busy` for the duration and
/// restoring it to `Available` on return regardless of outcome (§4.1
/// "Restores status to Available on return (success or failure)").
///
/// `long_context` selects the 10x prompt budget (§4.2) for models
/// configured as long-context.
pub async fn call_worker(
    http: &reqwest::Client,
    handle: &WorkerHandle,
    store: &dyn ConversationStore,
    question: &Question,
    now: i64,
    long_context: bool,
) -> UpstreamResult {
    handle.set_status(WorkerStatus::Busy);
    let result = call_worker_inner(http, handle, store, question, now, long_context).await;
    handle.set_status(WorkerStatus::Available);
    result
}

async fn call_worker_inner(
    http: &reqwest::Client,
    handle: &WorkerHandle,
    store: &dyn ConversationStore,
    question: &Question,
    now: i64,
    long_context: bool,
) -> UpstreamResult {
    let budget = if long_context { PromptBudget::WORKER.long_context() } else { PromptBudget::WORKER };
    let assembled = assemble_prompt(store, &question.conversation_id, &question.message, now, &budget).await;

    let request = WorkerRequestWire {
        content: assembled.current_message,
        history: assembled.history,
        model: handle.model_name.clone(),
    };

    let response = http
        .post(&handle.url)
        .timeout(WORKER_TIMEOUT)
        .json(&request)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(UpstreamError::Decode(format!("worker call returned status {}", response.status())));
    }

    let body: WorkerReplyWire = response.json().await.map_err(|e| UpstreamError::Decode(e.to_string()))?;

    if body.errcode != 0 {
        return Err(UpstreamError::Decode(format!("worker errcode {}", body.errcode)));
    }

    Ok(UpstreamOutcome::Answer(Answer {
        text: body.response,
        message_id: uuid::Uuid::new_v4().to_string(),
        conversation_id: resolve_conversation_id(&question.conversation_id),
        model: handle.model_name.clone(),
        origin: handle.url.clone(),
    }))
}
