// ── API-to-domain conversions ──
//
// Bridges raw `netpulse_api` rows into validated `Snapshot`s. Timestamps
// may arrive as RFC 3339 text or unix seconds/milliseconds; channels must
// be finite and non-negative; a missing total is inbound + outbound.

use chrono::{DateTime, Utc};
use tracing::warn;

use netpulse_api::{HistoryRows, RawSnapshot, RawTimestamp};

use crate::error::CoreError;
use crate::model::Snapshot;

/// Magnitudes at or above this are unix milliseconds, below it seconds.
/// 1e11 seconds is the year 5138; 1e11 milliseconds is 1973.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

// ── Helpers ────────────────────────────────────────────────────────

fn invalid(reason: impl Into<String>) -> CoreError {
    CoreError::InvalidSnapshot {
        reason: reason.into(),
    }
}

fn from_epoch_integer(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn from_epoch_float(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let secs = if value.abs() >= 1e11 { value / 1000.0 } else { value };
    if secs.abs() >= 1e13 {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Interpret a wire timestamp as an absolute instant.
pub fn parse_timestamp(raw: &RawTimestamp) -> Result<DateTime<Utc>, CoreError> {
    let parsed = match raw {
        RawTimestamp::Integer(value) => from_epoch_integer(*value),
        RawTimestamp::Float(value) => from_epoch_float(*value),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| text.parse::<i64>().ok().and_then(from_epoch_integer))
        }
    };
    parsed.ok_or_else(|| invalid(format!("unparseable timestamp {raw:?}")))
}

fn channel(name: &str, value: f64) -> Result<f64, CoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid(format!("{name} must be finite and non-negative, got {value}")))
    }
}

// ── Snapshot ───────────────────────────────────────────────────────

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = CoreError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&raw.timestamp)?;
        let inbound = channel("inbound", raw.inbound)?;
        let outbound = channel("outbound", raw.outbound)?;
        let total = match raw.total {
            Some(total) => channel("total", total)?,
            None => inbound + outbound,
        };
        Ok(Self {
            timestamp,
            inbound,
            outbound,
            total,
            extra: raw.extra,
        })
    }
}

/// Convert history rows, skipping invalid ones.
///
/// Returns the valid snapshots and the number of rows dropped, including
/// rows the API layer already failed to deserialize.
pub fn snapshots_from_history(history: HistoryRows) -> (Vec<Snapshot>, usize) {
    let mut skipped = history.skipped;
    let mut snapshots = Vec::with_capacity(history.rows.len());
    for row in history.rows {
        match Snapshot::try_from(row) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                warn!(error = %e, "skipping invalid history row");
                skipped += 1;
            }
        }
    }
    (snapshots, skipped)
}
