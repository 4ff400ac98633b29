//! Admission & dispatch core (§4.5): the bounded in-flight pending-question
//! queue, the retry loop, model routing, and the coordinator handshake.
//! This is the heart of the gateway; everything else in the workspace is a
//! collaborator this crate calls into.

mod context;
mod engine;
mod pending;
mod route;

pub use context::DispatchContext;
pub use engine::Engine;
pub use pending::PendingQuestion;

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
