use std::time::{Duration, Instant};

use gateway_registry::WorkerStatus;
use gateway_types::Answer;
use gateway_upstream::UpstreamOutcome;
use rand::Rng;
use tracing::warn;

use crate::context::DispatchContext;
use crate::pending::PendingQuestion;
use crate::unix_now;

const WORKER_SELECTION_DEADLINE: Duration = Duration::from_secs(60);
const HOSTED_RATE_LIMIT_COOLOFF: Duration = Duration::from_secs(30);

/// Outcome of one routed attempt. `Terminal` means the reply has already
/// been sent or deliberately closed — the retry loop returns. `Retry`
/// means the hosted path cleared continuity fields for a fresh re-route;
/// the retry loop re-checks `tried_times` before attempting again.
pub(crate) enum RouteOutcome {
    Terminal,
    Retry,
}

/// §4.5 "Selection and routing": worker path if the model has at least one
/// registered client, otherwise the hosted path.
pub(crate) async fn route_and_attempt(pq: &mut PendingQuestion, ctx: &DispatchContext) -> RouteOutcome {
    let bucket = ctx.registry.lookup(&pq.data.model).await;
    if !bucket.is_empty() {
        worker_path(pq, ctx, bucket).await
    } else {
        hosted_path(pq, ctx).await
    }
}

/// §4.5.1: random-rescan until an `Available` worker turns up or 60s pass.
async fn worker_path(
    pq: &mut PendingQuestion,
    ctx: &DispatchContext,
    bucket: Vec<std::sync::Arc<gateway_registry::WorkerHandle>>,
) -> RouteOutcome {
    let deadline = Instant::now() + WORKER_SELECTION_DEADLINE;
    let mut last_picked_url = String::new();

    let chosen = loop {
        let idx = rand::thread_rng().gen_range(0..bucket.len());
        let candidate = bucket[idx].clone();
        last_picked_url = candidate.url.clone();
        if candidate.status() == WorkerStatus::Available {
            break Some(candidate);
        }
        if Instant::now() >= deadline {
            break None;
        }
        tokio::task::yield_now().await;
    };

    let Some(worker) = chosen else {
        pq.send(Answer {
            text: String::new(),
            message_id: pq.data.message_id.clone(),
            conversation_id: pq.data.conversation_id.clone(),
            model: pq.data.model.clone(),
            origin: last_picked_url,
        });
        return RouteOutcome::Terminal;
    };

    let long_context = ctx.is_long_context(&worker.model_name);
    let outcome = gateway_upstream::call_worker(&ctx.http, &worker, ctx.store.as_ref(), &pq.data, unix_now(), long_context).await;

    match outcome {
        Ok(UpstreamOutcome::Answer(answer)) => pq.send(answer),
        Ok(UpstreamOutcome::RateLimited(_)) => {
            // Workers never rate-limit in this protocol; treat like any
            // other failure if it somehow occurs.
            pq.send(empty_worker_reply(pq, &worker.url));
        }
        Err(err) => {
            warn!(url = %worker.url, error = %err, "worker call failed");
            pq.send(empty_worker_reply(pq, &worker.url));
        }
    }
    RouteOutcome::Terminal
}

fn empty_worker_reply(pq: &PendingQuestion, worker_url: &str) -> Answer {
    Answer {
        text: String::new(),
        message_id: pq.data.message_id.clone(),
        conversation_id: pq.data.conversation_id.clone(),
        model: pq.data.model.clone(),
        origin: worker_url.to_string(),
    }
}

/// §4.5.2: credential-hint-first, else first-available; clear-and-re-route
/// on failure.
async fn hosted_path(pq: &mut PendingQuestion, ctx: &DispatchContext) -> RouteOutcome {
    let client = if !pq.data.credential.is_empty() {
        ctx.hosted_pool.by_credential(&pq.data.credential)
    } else {
        ctx.hosted_pool.first_available()
    };

    let Some(client) = client else {
        // No candidate credential: terminal failure, reply closes with no
        // value (§8 "All hosted credentials marked unavailable: dispatch
        // returns with no reply sent").
        pq.close();
        return RouteOutcome::Terminal;
    };

    pq.tried_times += 1;

    match client.get_answer(ctx.store.as_ref(), &pq.data, unix_now()).await {
        Ok(UpstreamOutcome::Answer(answer)) => {
            pq.send(answer);
            RouteOutcome::Terminal
        }
        Ok(UpstreamOutcome::RateLimited(_)) => {
            client.mark_rate_limited(HOSTED_RATE_LIMIT_COOLOFF);
            clear_continuity_for_reroute(pq);
            RouteOutcome::Retry
        }
        Err(err) => {
            warn!(credential = %client.credential, error = %err, "hosted call failed");
            clear_continuity_for_reroute(pq);
            RouteOutcome::Retry
        }
    }
}

fn clear_continuity_for_reroute(pq: &mut PendingQuestion) {
    pq.data.conversation_id.clear();
    pq.data.message_id.clear();
    pq.data.credential.clear();
}
