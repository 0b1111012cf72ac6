// ── Snapshot poller ──
//
// Timer-driven loop: one tick immediately on start, then one per period.
// Each tick spawns the fetch as its own task, so a slow request never
// delays the cadence and is never aborted by `stop()`.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(10);

/// `Stopped` / `Running` state machine around a tick task.
#[derive(Debug)]
pub struct SnapshotPoller {
    parent: CancellationToken,
    running: Option<CancellationToken>,
}

impl SnapshotPoller {
    /// Create a stopped poller. Cancelling `parent` stops it for good.
    pub fn new(parent: CancellationToken) -> Self {
        Self {
            parent,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Start ticking. No-op (returns `false`) if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&mut self, period: Duration, on_tick: F) -> bool
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_running() || self.parent.is_cancelled() {
            return false;
        }
        let cancel = self.parent.child_token();
        self.running = Some(cancel.clone());
        tokio::spawn(tick_task(period.max(MIN_PERIOD), on_tick, cancel));
        debug!(?period, "poller started");
        true
    }

    /// Stop ticking. In-flight fetches run to completion. Idempotent.
    pub fn stop(&mut self) -> bool {
        match self.running.take() {
            Some(cancel) if !cancel.is_cancelled() => {
                cancel.cancel();
                debug!("poller stopped");
                true
            }
            _ => false,
        }
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_task<F, Fut>(period: Duration, on_tick: F, cancel: CancellationToken)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                tokio::spawn(on_tick());
            }
        }
    }
}
