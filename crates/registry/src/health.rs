//! Background liveness probing for worker clients.
//!
//! One task per worker. Every [`HEALTH_CHECK_INTERVAL`] it POSTs
//! `{url}/health`; failure marks the worker `Down`, and success promotes a
//! `Down` worker back to `Available`. A worker already `Busy` (an in-flight
//! dispatch call) is left untouched — the monitor never sets `Busy` itself.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::{WorkerHandle, WorkerStatus};

pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Apply one probe's outcome to `handle`'s status, per the transition table
/// in the module docs. Split out from [`probe_loop`] so it is unit-testable
/// without a real HTTP client.
pub(crate) fn apply_probe_result(handle: &WorkerHandle, succeeded: bool) {
    if !succeeded {
        handle.set_status(WorkerStatus::Down);
        return;
    }
    if handle.status() == WorkerStatus::Down {
        handle.set_status(WorkerStatus::Available);
    }
}

async fn probe_once(client: &reqwest::Client, url: &str) -> bool {
    client
        .post(format!("{url}/health"))
        .timeout(HEALTH_CHECK_TIMEOUT)
        .send()
        .await
        .map(|resp| resp.status().is_success())
        .unwrap_or(false)
}

async fn probe_loop(handle: Arc<WorkerHandle>, client: reqwest::Client) {
    loop {
        let ok = probe_once(&client, &handle.url).await;
        if !ok {
            warn!(url = %handle.url, "worker health check failed");
        } else {
            debug!(url = %handle.url, "worker health check ok");
        }
        apply_probe_result(&handle, ok);
        tokio::time::sleep(HEALTH_CHECK_INTERVAL).await;
    }
}

/// Spawn the probe task for one worker. The returned handle is detached by
/// the caller by design — workers live for the process lifetime (§3: "never
/// destroyed within process lifetime"), so there is no explicit stop signal.
pub fn spawn_health_monitor(handle: Arc<WorkerHandle>, client: reqwest::Client) -> tokio::task::JoinHandle<()> {
    tokio::spawn(probe_loop(handle, client))
}
