use std::sync::Arc;
use std::time::Duration;

use gateway_types::{Answer, Question};
use rand::Rng;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::DispatchContext;
use crate::pending::PendingQuestion;
use crate::route::{RouteOutcome, route_and_attempt};

/// §4.5.3's 3-minute outer deadline, covering both the admission send and
/// the reply wait as a single timer.
const COORDINATOR_DEADLINE: Duration = Duration::from_secs(180);

/// The dispatch core: an admission channel `Q` feeding a single dispatcher
/// task, which fans out onto `max_in_flight` concurrent worker coroutines.
pub struct Engine {
    admit: mpsc::Sender<PendingQuestion>,
}

impl Engine {
    pub fn new(ctx: DispatchContext, max_in_flight: usize) -> Self {
        let ctx = Arc::new(ctx);
        // `channel(1)` is the closest idiomatic tokio stand-in for an
        // unbuffered handoff: the sender's `send` only resolves once the
        // dispatcher has taken the single slot.
        let (admit, rx) = mpsc::channel(1);
        let semaphore = Arc::new(Semaphore::new(max_in_flight));
        tokio::spawn(run_dispatcher(rx, ctx, semaphore));
        Self { admit }
    }

    /// §4.6 step 6 / §4.5.3: build the pending question, hand it to the
    /// dispatcher, and await its reply, both bounded by one 3-minute
    /// deadline. Always resolves — to a real answer, or to an empty one on
    /// timeout, admission failure, or a reply channel closed with no value.
    pub async fn dispatch(&self, question: Question) -> Answer {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let pq = PendingQuestion::new(question, reply_tx, cancel.clone());

        let admit = self.admit.clone();
        let round_trip = async move {
            admit.send(pq).await.ok()?;
            reply_rx.await.ok()
        };

        match tokio::time::timeout(COORDINATOR_DEADLINE, round_trip).await {
            Ok(Some(answer)) => answer,
            Ok(None) => Answer::default(),
            Err(_elapsed) => {
                cancel.cancel();
                Answer::default()
            }
        }
    }
}

async fn run_dispatcher(mut rx: mpsc::Receiver<PendingQuestion>, ctx: Arc<DispatchContext>, semaphore: Arc<Semaphore>) {
    while let Some(pq) = rx.recv().await {
        let ctx = ctx.clone();
        let semaphore = semaphore.clone();
        tokio::spawn(async move {
            run_pending_question(pq, ctx, semaphore).await;
        });
    }
}

async fn run_pending_question(mut pq: PendingQuestion, ctx: Arc<DispatchContext>, semaphore: Arc<Semaphore>) {
    let permit = tokio::select! {
        permit = semaphore.acquire_owned() => permit,
        _ = pq.cancel.cancelled() => return,
    };
    let Ok(_permit) = permit else { return };

    loop {
        if pq.cancel.is_cancelled() {
            pq.close();
            return;
        }
        if pq.tried_times > ctx.max_retry {
            pq.close();
            return;
        }

        match route_and_attempt(&mut pq, &ctx).await {
            RouteOutcome::Terminal => return,
            RouteOutcome::Retry => {
                let jitter_ms = 1000 + rand::thread_rng().gen_range(0..500);
                debug!(jitter_ms, "retrying pending question");
                tokio::time::sleep(Duration::from_millis(jitter_ms)).await;
            }
        }
    }
}
