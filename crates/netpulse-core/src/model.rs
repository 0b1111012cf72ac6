// ── Domain model ──
//
// Snapshots, chart points, time ranges, and the mode/origin tags that the
// guard compares. Wire-level rows live in `netpulse_api::models`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::CoreError;

// ── Snapshot ────────────────────────────────────────────────────────

/// One validated point-in-time measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub inbound: f64,
    pub outbound: f64,
    pub total: f64,
    /// Auxiliary metrics (sessions, threat counters, ...), passed through.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── SeriesPoint ─────────────────────────────────────────────────────

/// A chart-ready point. Created when a snapshot is accepted, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub inbound: f64,
    pub outbound: f64,
    pub total: f64,
}

impl SeriesPoint {
    /// Build a point, labelling it in local time for the given mode.
    pub fn from_snapshot(snapshot: &Snapshot, mode: Mode) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            label: snapshot
                .timestamp
                .with_timezone(&Local)
                .format(mode.label_format())
                .to_string(),
            inbound: snapshot.inbound,
            outbound: snapshot.outbound,
            total: snapshot.total,
        }
    }
}

// ── TimeRange ───────────────────────────────────────────────────────

/// The closed set of historical ranges.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum TimeRange {
    #[strum(serialize = "15m")]
    #[serde(rename = "15m")]
    Minutes15,
    #[strum(serialize = "30m")]
    #[serde(rename = "30m")]
    Minutes30,
    #[strum(serialize = "1h")]
    #[serde(rename = "1h")]
    Hour1,
    #[strum(serialize = "6h")]
    #[serde(rename = "6h")]
    Hours6,
    #[strum(serialize = "12h")]
    #[serde(rename = "12h")]
    Hours12,
    #[strum(serialize = "24h")]
    #[serde(rename = "24h")]
    Hours24,
    #[strum(serialize = "7d")]
    #[serde(rename = "7d")]
    Days7,
}

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

impl TimeRange {
    /// Identifier used on the wire and in the preference store.
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// Span of the range.
    pub const fn duration(self) -> Duration {
        match self {
            Self::Minutes15 => Duration::from_secs(15 * 60),
            Self::Minutes30 => Duration::from_secs(30 * 60),
            Self::Hour1 => HOUR,
            Self::Hours6 => Duration::from_secs(6 * 3600),
            Self::Hours12 => Duration::from_secs(12 * 3600),
            Self::Hours24 => Duration::from_secs(24 * 3600),
            Self::Days7 => Duration::from_secs(7 * 24 * 3600),
        }
    }

    /// Spacing of points in the range: per minute, except `7d` per hour.
    pub const fn resolution(self) -> Duration {
        match self {
            Self::Days7 => HOUR,
            _ => MINUTE,
        }
    }

    /// Buffer capacity while this range is displayed: one point per
    /// [`resolution`](Self::resolution) step.
    pub const fn capacity(self) -> usize {
        match self {
            Self::Minutes15 => 15,
            Self::Minutes30 => 30,
            Self::Hour1 => 60,
            Self::Hours6 => 360,
            Self::Hours12 => 720,
            Self::Hours24 => 1440,
            Self::Days7 => 168,
        }
    }

    /// Collapse time-ordered snapshots to one per
    /// [`resolution`](Self::resolution) step, keeping the newest row of
    /// each step. A `7d` range of minute rows becomes hourly points.
    pub fn downsample(self, snapshots: Vec<Snapshot>) -> Vec<Snapshot> {
        let step = i64::try_from(self.resolution().as_secs()).unwrap_or(i64::MAX);
        let bucket = |s: &Snapshot| s.timestamp.timestamp().div_euclid(step);

        let mut out: Vec<Snapshot> = Vec::with_capacity(snapshots.len().min(self.capacity()));
        for snapshot in snapshots {
            match out.last_mut() {
                Some(last) if bucket(last) == bucket(&snapshot) => *last = snapshot,
                _ => out.push(snapshot),
            }
        }
        out
    }

    /// Smallest range spanning `window`, or the widest range if none does.
    pub fn covering(window: Duration) -> Self {
        Self::iter()
            .find(|r| r.duration() >= window)
            .unwrap_or(Self::Days7)
    }
}

// ── Mode ────────────────────────────────────────────────────────────

/// What the dashboard is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Live,
    Historical(TimeRange),
}

/// Preference value for [`Mode::Live`].
pub const LIVE_ID: &str = "live";

impl Mode {
    /// Value stored under the preference key.
    pub fn preference_value(self) -> &'static str {
        match self {
            Self::Live => LIVE_ID,
            Self::Historical(range) => range.id(),
        }
    }

    /// Parse a stored preference. Anything outside the closed set is `None`.
    pub fn from_preference(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case(LIVE_ID) {
            return Some(Self::Live);
        }
        TimeRange::from_str(value).ok().map(Self::Historical)
    }

    pub fn source(self) -> SourceKind {
        match self {
            Self::Live => SourceKind::Live,
            Self::Historical(_) => SourceKind::Historical,
        }
    }

    pub fn range(self) -> Option<TimeRange> {
        match self {
            Self::Live => None,
            Self::Historical(range) => Some(range),
        }
    }

    /// `strftime` pattern for point labels in this mode.
    pub fn label_format(self) -> &'static str {
        match self {
            Self::Live => "%H:%M:%S",
            Self::Historical(range) if range.duration() <= TimeRange::Hours24.duration() => {
                "%H:%M"
            }
            Self::Historical(_) => "%m-%d %H:%M",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preference_value())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_preference(s).ok_or_else(|| CoreError::InvalidMode {
            value: s.to_owned(),
        })
    }
}

// ── Origin ──────────────────────────────────────────────────────────

/// The mode a result was fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Live,
    Historical,
}

/// Tag carried by a fetch result from issue to application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub source: SourceKind,
    /// Set for historical fetches only.
    pub range: Option<TimeRange>,
    pub device: Option<String>,
}

impl Origin {
    pub fn live(device: Option<String>) -> Self {
        Self {
            source: SourceKind::Live,
            range: None,
            device,
        }
    }

    pub fn historical(range: TimeRange, device: Option<String>) -> Self {
        Self {
            source: SourceKind::Historical,
            range: Some(range),
            device,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn capacities_follow_resolution() {
        let caps: Vec<(&str, usize)> = TimeRange::iter().map(|r| (r.id(), r.capacity())).collect();
        assert_eq!(
            caps,
            vec![
                ("15m", 15),
                ("30m", 30),
                ("1h", 60),
                ("6h", 360),
                ("12h", 720),
                ("24h", 1440),
                ("7d", 168),
            ]
        );
        for range in TimeRange::iter() {
            let steps = range.duration().as_secs() / range.resolution().as_secs();
            assert_eq!(usize::try_from(steps).ok(), Some(range.capacity()));
        }
    }

    fn minute_rows(count: i64) -> Vec<Snapshot> {
        (0..count)
            .map(|i| Snapshot {
                timestamp: Utc.timestamp_opt(1_718_000_000 + i * 60, 0).unwrap(),
                inbound: 1.0,
                outbound: 1.0,
                total: 2.0,
                extra: serde_json::Map::new(),
            })
            .collect()
    }

    #[test]
    fn week_of_minute_rows_becomes_hourly() {
        let rows = minute_rows(7 * 24 * 60);
        let newest = rows.last().map(|s| s.timestamp);
        let hourly = TimeRange::Days7.downsample(rows);

        assert!(hourly.len() <= 169);
        assert!(hourly.len() >= 168);
        assert_eq!(hourly.last().map(|s| s.timestamp), newest);
        let span = hourly.last().unwrap().timestamp - hourly.first().unwrap().timestamp;
        assert!(span.num_hours() >= 166, "span was {}h", span.num_hours());
        assert!(
            hourly
                .windows(2)
                .all(|w| (w[1].timestamp - w[0].timestamp).num_minutes() >= 1)
        );
    }

    #[test]
    fn minute_ranges_keep_minute_rows() {
        let rows = minute_rows(15);
        assert_eq!(TimeRange::Minutes15.downsample(rows.clone()), rows);
    }

    #[test]
    fn preference_values_round_trip() {
        for mode in std::iter::once(Mode::Live).chain(TimeRange::iter().map(Mode::Historical)) {
            assert_eq!(Mode::from_preference(mode.preference_value()), Some(mode));
        }
    }

    #[test]
    fn unknown_preference_is_rejected() {
        assert_eq!(Mode::from_preference("2h"), None);
        assert_eq!(Mode::from_preference(""), None);
        assert!(matches!(
            "90d".parse::<Mode>(),
            Err(CoreError::InvalidMode { .. })
        ));
    }

    #[test]
    fn covering_picks_smallest_sufficient_range() {
        assert_eq!(TimeRange::covering(Duration::from_secs(30 * 60)), TimeRange::Minutes30);
        assert_eq!(TimeRange::covering(Duration::from_secs(31 * 60)), TimeRange::Hour1);
        assert_eq!(TimeRange::covering(Duration::from_secs(30 * 86_400)), TimeRange::Days7);
    }

    #[test]
    fn label_format_depends_on_mode() {
        let snapshot = Snapshot {
            timestamp: Utc
                .with_ymd_and_hms(2024, 6, 15, 10, 30, 5)
                .single()
                .expect("valid instant"),
            inbound: 1.0,
            outbound: 2.0,
            total: 3.0,
            extra: serde_json::Map::new(),
        };
        let live = SeriesPoint::from_snapshot(&snapshot, Mode::Live);
        let hour = SeriesPoint::from_snapshot(&snapshot, Mode::Historical(TimeRange::Hour1));
        let week = SeriesPoint::from_snapshot(&snapshot, Mode::Historical(TimeRange::Days7));
        assert_eq!(live.label.matches(':').count(), 2);
        assert_eq!(hour.label.matches(':').count(), 1);
        assert!(week.label.contains('-'));
        assert!((live.total - 3.0).abs() < f64::EPSILON);
    }
}
