use gateway_types::{Answer, Question};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// One admitted question (§3 "Pending question"). Created per HTTP request
/// by the coordinator, destroyed when its worker coroutine returns.
pub struct PendingQuestion {
    pub data: Question,
    pub tried_times: u32,
    reply: Option<oneshot::Sender<Answer>>,
    pub cancel: CancellationToken,
}

impl PendingQuestion {
    pub fn new(data: Question, reply: oneshot::Sender<Answer>, cancel: CancellationToken) -> Self {
        Self {
            data,
            tried_times: 0,
            reply: Some(reply),
            cancel,
        }
    }

    /// Sends the one permitted value. A receiver that has already given up
    /// (coordinator timed out mid-send) simply swallows the error — the
    /// oneshot-as-buffered-1-channel equivalence documented in DESIGN.md.
    pub fn send(&mut self, answer: Answer) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(answer);
        }
    }

    /// Drops the reply sender without a value, closing the channel —
    /// retries-exhausted or abandoned-before-dispatch.
    pub fn close(&mut self) {
        self.reply = None;
    }
}
