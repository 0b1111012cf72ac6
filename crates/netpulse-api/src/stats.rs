// Stats endpoints
//
// Inherent methods on `RequestClient` for the two read-only metric
// endpoints. Payload conversion failures become `RequestOutcome::Error`.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::RequestClient;
use crate::models::{HistoryRows, RawSnapshot};
use crate::outcome::RequestOutcome;

const LATEST_PATH: &str = "api/stats/latest";
const HISTORY_PATH: &str = "api/stats/history";

impl RequestClient {
    /// Fetch the most recent snapshot.
    ///
    /// `GET api/stats/latest[?device=<id>]`. A `null` payload means the
    /// appliance answered but has nothing to report and maps to `None`.
    pub async fn latest_snapshot(
        &self,
        device: Option<&str>,
    ) -> RequestOutcome<Option<RawSnapshot>> {
        let query = device_query(device);
        self.request(LATEST_PATH, Method::GET, None, &query)
            .await
            .try_map(|value| {
                if value.is_null() {
                    return Ok(None);
                }
                serde_json::from_value(value)
                    .map(Some)
                    .map_err(|e| format!("malformed snapshot: {e}"))
            })
    }

    /// Fetch the rows for a historical range.
    ///
    /// `GET api/stats/history?range=<id>[&device=<id>]`. The payload may be
    /// a bare array or an object carrying the array under `rows`/`points`.
    /// Rows that fail to deserialize are skipped and counted.
    pub async fn history_rows(
        &self,
        range: &str,
        device: Option<&str>,
    ) -> RequestOutcome<HistoryRows> {
        let mut query = vec![("range", range.to_owned())];
        query.extend(device_query(device));
        self.request(HISTORY_PATH, Method::GET, None, &query)
            .await
            .try_map(|value| parse_history(value, range))
    }
}

fn device_query(device: Option<&str>) -> Vec<(&'static str, String)> {
    device
        .filter(|d| !d.is_empty())
        .map(|d| vec![("device", d.to_owned())])
        .unwrap_or_default()
}

fn parse_history(value: Value, range: &str) -> Result<HistoryRows, String> {
    let items = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("rows").or_else(|| map.remove("points")) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(format!(
                    "malformed history: expected an array of rows, got {}",
                    json_type(&other)
                ));
            }
        },
        other => {
            return Err(format!(
                "malformed history: expected an array of rows, got {}",
                json_type(&other)
            ));
        }
    };

    let mut out = HistoryRows::default();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawSnapshot>(item) {
            Ok(row) => out.rows.push(row),
            Err(e) => {
                warn!(range, index, error = %e, "skipping malformed history row");
                out.skipped += 1;
            }
        }
    }
    debug!(range, rows = out.rows.len(), skipped = out.skipped, "history parsed");
    Ok(out)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
