// Wire models for the appliance stats endpoints.
//
// These mirror the JSON shapes the appliance sends. Validation and
// timestamp interpretation happen in netpulse-core when the rows are
// converted into domain snapshots.

use serde::{Deserialize, Serialize};

/// Status envelope: `{ "status": "...", "data": ..., "message": "..." }`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub status: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

/// A timestamp as sent on the wire: RFC 3339 text, or unix seconds /
/// milliseconds as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// One metric row from the latest or history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    #[serde(alias = "time", alias = "ts")]
    pub timestamp: RawTimestamp,

    #[serde(alias = "in", alias = "rx")]
    pub inbound: f64,

    #[serde(alias = "out", alias = "tx")]
    pub outbound: f64,

    #[serde(default)]
    pub total: Option<f64>,

    /// Session counts, threat counters, and anything else the appliance
    /// reports. Passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Rows of a history response. Rows that do not match [`RawSnapshot`]
/// are counted in `skipped` instead of failing the whole range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryRows {
    pub rows: Vec<RawSnapshot>,
    pub skipped: usize,
}
