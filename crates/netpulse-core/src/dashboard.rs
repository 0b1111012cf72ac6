// ── Dashboard ──
//
// Orchestrates one series buffer, one mode controller, and one poller.
// Buffer and mode share a single async mutex so "guard then mutate" is
// one critical section. The lock is never held across a fetch; a mode
// switch abandons in-flight requests by letting the guard drop them.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use netpulse_api::{FailureClass, OutcomeKind, RequestOutcome};

use crate::buffer::{AppendResult, ChartFrame, SeriesBuffer};
use crate::config::DashboardConfig;
use crate::error::CoreError;
use crate::events::{DashboardEvent, EventBus};
use crate::mode::ModeController;
use crate::model::{Mode, Origin, SeriesPoint, Snapshot, SourceKind, TimeRange};
use crate::notice::NoticeBoard;
use crate::poller::SnapshotPoller;
use crate::prefs::PreferenceStore;
use crate::source::MetricsSource;
use crate::stream::SeriesSubscription;

/// Receives the full series after every accepted mutation.
///
/// Called with the dashboard lock held; implementations must not block.
pub trait RenderSink: Send + Sync {
    fn render(&self, frame: &ChartFrame);
}

/// Result of a guarded buffer mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferResult {
    /// The origin does not match the active mode; the buffer was not touched.
    Dropped,
    Applied(AppendResult),
}

// ── Dashboard ────────────────────────────────────────────────────────

/// Cheaply cloneable handle; all clones drive the same state.
pub struct Dashboard<S> {
    inner: Arc<DashboardInner<S>>,
}

impl<S> Clone for Dashboard<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> fmt::Debug for Dashboard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

struct DashboardInner<S> {
    source: S,
    config: DashboardConfig,
    state: Mutex<DashboardState>,
    series_tx: watch::Sender<Arc<[SeriesPoint]>>,
    events: EventBus,
    notices: NoticeBoard,
    sink: Option<Arc<dyn RenderSink>>,
    cancel: CancellationToken,
}

struct DashboardState {
    buffer: SeriesBuffer,
    mode: ModeController,
    device: Option<String>,
    poller: SnapshotPoller,
    started: bool,
}

impl<S: MetricsSource> Dashboard<S> {
    /// Create a dashboard. The initial mode comes from `prefs`; nothing is
    /// fetched until [`start()`](Self::start).
    pub fn new(
        source: S,
        prefs: Arc<dyn PreferenceStore>,
        config: DashboardConfig,
    ) -> Result<Self, CoreError> {
        Self::build(source, prefs, config, None)
    }

    /// Like [`new()`](Self::new), emitting every accepted mutation to `sink`.
    pub fn with_render_sink(
        source: S,
        prefs: Arc<dyn PreferenceStore>,
        config: DashboardConfig,
        sink: Arc<dyn RenderSink>,
    ) -> Result<Self, CoreError> {
        Self::build(source, prefs, config, Some(sink))
    }

    fn build(
        source: S,
        prefs: Arc<dyn PreferenceStore>,
        config: DashboardConfig,
        sink: Option<Arc<dyn RenderSink>>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let mode = ModeController::load(prefs);
        let buffer = SeriesBuffer::new(capacity_for(mode.mode(), &config));
        let (series_tx, _) = watch::channel(buffer.snapshot());
        let events = EventBus::new(config.event_capacity);
        let notices = NoticeBoard::new(config.notice_ttl, cancel.child_token());
        let poller = SnapshotPoller::new(cancel.child_token());

        Ok(Self {
            inner: Arc::new(DashboardInner {
                source,
                config,
                state: Mutex::new(DashboardState {
                    buffer,
                    mode,
                    device: None,
                    poller,
                    started: false,
                }),
                series_tx,
                events,
                notices,
                sink,
                cancel,
            }),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Enter the initial mode's load path.
    pub async fn start(&self) {
        let mode = {
            let mut st = self.lock().await;
            st.started = true;
            st.mode.mode()
        };
        info!(%mode, "dashboard starting");
        self.enter(mode).await;
    }

    /// Switch modes: persist, stop or start polling, load the new mode.
    pub async fn set_mode(&self, to: Mode) {
        let transition = {
            let mut st = self.lock().await;
            st.started = true;
            if to != Mode::Live {
                st.poller.stop();
            }
            st.mode.transition(to)
        };
        info!(from = %transition.from, to = %transition.to, "mode change");
        self.enter(to).await;
    }

    /// Select the device whose metrics are shown (`None` for all).
    ///
    /// Publishes `device:change`, then reloads the current mode if the
    /// dashboard has started. Selecting the current device does nothing.
    pub async fn select_device(&self, device: Option<String>) {
        let device = device.filter(|d| !d.is_empty());
        let reload = {
            let mut st = self.lock().await;
            if st.device == device {
                return;
            }
            st.device.clone_from(&device);
            st.started.then(|| st.mode.mode())
        };
        info!(device = device.as_deref().unwrap_or("all"), "device selected");
        self.inner
            .events
            .publish(DashboardEvent::DeviceChange { device });
        if let Some(mode) = reload {
            self.enter(mode).await;
        }
    }

    /// Stop polling and cancel pending banner timers. In-flight fetches
    /// finish but can no longer restart anything.
    pub async fn shutdown(&self) {
        self.lock().await.poller.stop();
        self.inner.cancel.cancel();
        debug!("dashboard shut down");
    }

    // ── Guarded mutations ────────────────────────────────────────────

    /// Append a point if `source` matches the active mode.
    pub async fn offer(&self, point: SeriesPoint, source: SourceKind) -> OfferResult {
        let mut st = self.lock().await;
        if !st.mode.accepts(source) {
            debug!(%source, mode = %st.mode.mode(), "dropping point for inactive mode");
            return OfferResult::Dropped;
        }
        self.append_locked(&mut st, point)
    }

    /// Replace the series if `source` matches the active mode. Returns the
    /// resulting length, or `None` when dropped.
    pub async fn replace(
        &self,
        points: impl IntoIterator<Item = SeriesPoint>,
        source: SourceKind,
    ) -> Option<usize> {
        let mut st = self.lock().await;
        if !st.mode.accepts(source) {
            debug!(%source, mode = %st.mode.mode(), "dropping series for inactive mode");
            return None;
        }
        let kept = st.buffer.replace_all(points);
        self.publish_series(&st.buffer);
        Some(kept)
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Current series, oldest first.
    pub fn series(&self) -> Arc<[SeriesPoint]> {
        self.inner.series_tx.borrow().clone()
    }

    pub fn subscribe_series(&self) -> SeriesSubscription {
        SeriesSubscription::new(self.inner.series_tx.subscribe())
    }

    pub async fn mode(&self) -> Mode {
        self.lock().await.mode.mode()
    }

    pub async fn device(&self) -> Option<String> {
        self.lock().await.device.clone()
    }

    pub async fn poller_running(&self) -> bool {
        self.lock().await.poller.is_running()
    }

    pub async fn capacity(&self) -> usize {
        self.lock().await.buffer.capacity()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.inner.notices
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn source(&self) -> &S {
        &self.inner.source
    }

    // ── Load paths ───────────────────────────────────────────────────

    async fn enter(&self, mode: Mode) {
        match mode {
            Mode::Live => self.enter_live().await,
            Mode::Historical(range) => self.load_history(range).await,
        }
    }

    async fn enter_live(&self) {
        let device = {
            let mut st = self.lock().await;
            if st.mode.mode() != Mode::Live {
                return;
            }
            st.buffer.set_capacity(self.inner.config.live_capacity);
            st.buffer.clear();
            self.publish_series(&st.buffer);
            st.device.clone()
        };

        if self.inner.config.backfill {
            self.backfill(device).await;
        }

        let mut st = self.lock().await;
        if st.mode.mode() == Mode::Live {
            self.start_poller(&mut st.poller);
        }
    }

    /// Seed the live window from the history endpoint. Best effort: any
    /// failure leaves the window to the poller.
    async fn backfill(&self, device: Option<String>) {
        let range = self.inner.config.backfill_range();
        let origin = Origin::live(device);
        let mut snapshots = match self
            .inner
            .source
            .history(range, origin.device.as_deref())
            .await
        {
            RequestOutcome::Success(snapshots) => snapshots,
            other => {
                debug!(%range, outcome = %other.kind(), "live backfill skipped");
                return;
            }
        };
        snapshots.sort_by_key(|s| s.timestamp);

        let mut st = self.lock().await;
        if !admit(&st, &origin) {
            return;
        }
        // Anything polled while the backfill was in flight stays in place.
        let first = st.buffer.first().map(|p| p.timestamp);
        let merged: Vec<SeriesPoint> = snapshots
            .iter()
            .filter(|s| first.is_none_or(|f| s.timestamp < f))
            .map(|s| SeriesPoint::from_snapshot(s, Mode::Live))
            .chain(st.buffer.iter().cloned())
            .collect();
        let kept = st.buffer.replace_all(merged);
        self.publish_series(&st.buffer);
        debug!(%range, points = kept, "live window backfilled");
    }

    async fn load_history(&self, range: TimeRange) {
        let origin = {
            let mut st = self.lock().await;
            if st.mode.mode() != Mode::Historical(range) {
                return;
            }
            st.poller.stop();
            Origin::historical(range, st.device.clone())
        };

        let mut snapshots = match self
            .inner
            .source
            .history(range, origin.device.as_deref())
            .await
        {
            RequestOutcome::Success(snapshots) => snapshots,
            other => {
                self.report(other.kind(), other.describe().unwrap_or_default(), &origin)
                    .await;
                return;
            }
        };
        snapshots.sort_by_key(|s| s.timestamp);
        let snapshots = range.downsample(snapshots);

        let mode = Mode::Historical(range);
        let points: Vec<SeriesPoint> = snapshots
            .iter()
            .map(|s| SeriesPoint::from_snapshot(s, mode))
            .collect();

        let kept = {
            let mut st = self.lock().await;
            if !admit(&st, &origin) {
                return;
            }
            st.buffer.set_capacity(range.capacity());
            let kept = st.buffer.replace_all(points);
            self.publish_series(&st.buffer);
            kept
        };
        info!(%range, points = kept, "historical range loaded");

        if kept == 0 {
            self.inner.events.publish(DashboardEvent::NoData { mode });
            self.inner
                .notices
                .info(format!("No data for the last {range}"));
        }
    }

    /// One live tick: fetch, guard, append, republish.
    async fn poll_live(&self) {
        let origin = {
            let st = self.lock().await;
            if !st.mode.accepts(SourceKind::Live) {
                return;
            }
            Origin::live(st.device.clone())
        };

        match self.inner.source.latest(origin.device.as_deref()).await {
            RequestOutcome::Success(Some(snapshot)) => {
                self.apply_live(snapshot, &origin).await;
            }
            RequestOutcome::Success(None) => {
                if self.still_admitted(&origin).await {
                    debug!("latest endpoint returned no snapshot");
                    self.inner
                        .events
                        .publish(DashboardEvent::NoData { mode: Mode::Live });
                }
            }
            other => {
                self.report(other.kind(), other.describe().unwrap_or_default(), &origin)
                    .await;
            }
        }
    }

    async fn apply_live(&self, snapshot: Snapshot, origin: &Origin) {
        let point = SeriesPoint::from_snapshot(&snapshot, Mode::Live);
        let result = {
            let mut st = self.lock().await;
            if !admit(&st, origin) {
                return;
            }
            self.append_locked(&mut st, point)
        };
        match result {
            OfferResult::Applied(AppendResult::Accepted | AppendResult::RejectedDuplicate) => {
                self.inner
                    .events
                    .publish(DashboardEvent::SnapshotUpdate(Arc::new(snapshot)));
            }
            OfferResult::Applied(AppendResult::RejectedOutOfOrder) | OfferResult::Dropped => {}
        }
    }

    /// Surface a non-success outcome, unless its origin is stale.
    async fn report(&self, kind: OutcomeKind, message: String, origin: &Origin) {
        if !self.still_admitted(origin).await {
            return;
        }
        match kind.failure_class() {
            FailureClass::NotAFailure => {
                debug!(source = %origin.source, text = %message, "appliance is waiting for data");
                self.inner.notices.info(message.clone());
                self.inner
                    .events
                    .publish(DashboardEvent::Waiting { message });
            }
            class => {
                warn!(source = %origin.source, %kind, error = %message, "request failed");
                if class == FailureClass::Recoverable {
                    self.inner.notices.warning(message.clone());
                } else {
                    self.inner.notices.error(message.clone());
                }
                self.inner.events.publish(DashboardEvent::Error {
                    kind,
                    source: origin.source,
                    message,
                });
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.inner.state.lock().await
    }

    async fn still_admitted(&self, origin: &Origin) -> bool {
        admit(&*self.lock().await, origin)
    }

    fn append_locked(&self, st: &mut DashboardState, point: SeriesPoint) -> OfferResult {
        let result = st.buffer.append(point);
        if result == AppendResult::Accepted {
            self.publish_series(&st.buffer);
        } else {
            debug!(?result, "point rejected by series buffer");
        }
        OfferResult::Applied(result)
    }

    fn publish_series(&self, buffer: &SeriesBuffer) {
        self.inner.series_tx.send_replace(buffer.snapshot());
        if let Some(sink) = &self.inner.sink {
            sink.render(&buffer.to_frame());
        }
    }

    fn start_poller(&self, poller: &mut SnapshotPoller) {
        let weak: Weak<DashboardInner<S>> = Arc::downgrade(&self.inner);
        poller.start(self.inner.config.poll_interval, move || {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    Dashboard { inner }.poll_live().await;
                }
            }
        });
    }
}

/// The mode guard plus the device check.
fn admit(st: &DashboardState, origin: &Origin) -> bool {
    if st.mode.admits(origin) && st.device == origin.device {
        return true;
    }
    debug!(
        source = %origin.source,
        range = ?origin.range,
        mode = %st.mode.mode(),
        "dropping result for inactive mode"
    );
    false
}

fn capacity_for(mode: Mode, config: &DashboardConfig) -> usize {
    match mode {
        Mode::Live => config.live_capacity,
        Mode::Historical(range) => range.capacity(),
    }
}
