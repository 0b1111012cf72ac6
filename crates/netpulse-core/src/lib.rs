//! Mode-aware data layer between `netpulse-api` and dashboard consumers.
//!
//! - **[`Dashboard`]**: orchestrator owning one [`SeriesBuffer`], one
//!   [`ModeController`], and one [`SnapshotPoller`]. Implements the mode
//!   transition handler, historical loads, device selection, and render
//!   sink emission.
//!
//! - **[`SeriesBuffer`]**: bounded, deduplicated, strictly ordered series
//!   of chart points. Rejects duplicates and late arrivals.
//!
//! - **[`ModeController`]**: tracks `Live` / `Historical(range)` and guards
//!   every buffer mutation against results that belong to another mode,
//!   range, or device.
//!
//! - **[`EventBus`]** / **[`NoticeBoard`]**: summary-widget events and the
//!   single auto-dismissing user-visible banner.
//!
//! - **[`PreferenceStore`]**: synchronous key/value persistence for the
//!   selected time range. An in-memory implementation lives here; the file
//!   backed one lives in `netpulse-config`.

pub mod buffer;
pub mod config;
pub mod convert;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod mode;
pub mod model;
pub mod notice;
pub mod poller;
pub mod prefs;
pub mod source;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use buffer::{AppendResult, ChartFrame, SeriesBuffer};
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, OfferResult, RenderSink};
pub use error::{CoreError, outcome_into_result};
pub use events::{DashboardEvent, EventBus, EventKind, EventSubscription};
pub use mode::{ModeController, Transition};
pub use model::{Mode, Origin, SeriesPoint, Snapshot, SourceKind, TimeRange};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use poller::SnapshotPoller;
pub use prefs::{MemoryPreferences, PreferenceStore, SELECTED_RANGE_KEY};
pub use source::MetricsSource;
pub use stream::{SeriesStream, SeriesSubscription};

// Outcome types are part of the public surface of `MetricsSource`.
pub use netpulse_api::{FailureClass, OutcomeKind, RequestOutcome};
