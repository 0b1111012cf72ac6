// ── Metrics source ──
//
// The seam between the dashboard and the network. The production source
// is `netpulse_api::RequestClient`; tests substitute scripted sources.

use std::future::Future;

use tracing::debug;

use netpulse_api::{RequestClient, RequestOutcome};

use crate::convert::snapshots_from_history;
use crate::model::{Snapshot, TimeRange};

/// Fetches validated snapshots for the dashboard.
pub trait MetricsSource: Send + Sync + 'static {
    /// Most recent snapshot, `None` when the appliance reports nothing.
    fn latest(
        &self,
        device: Option<&str>,
    ) -> impl Future<Output = RequestOutcome<Option<Snapshot>>> + Send;

    /// Snapshots of a historical range. Invalid rows are already dropped.
    fn history(
        &self,
        range: TimeRange,
        device: Option<&str>,
    ) -> impl Future<Output = RequestOutcome<Vec<Snapshot>>> + Send;
}

impl MetricsSource for RequestClient {
    async fn latest(&self, device: Option<&str>) -> RequestOutcome<Option<Snapshot>> {
        self.latest_snapshot(device).await.try_map(|raw| {
            raw.map(Snapshot::try_from)
                .transpose()
                .map_err(|e| e.to_string())
        })
    }

    async fn history(
        &self,
        range: TimeRange,
        device: Option<&str>,
    ) -> RequestOutcome<Vec<Snapshot>> {
        self.history_rows(range.id(), device)
            .await
            .map(|rows| {
                let (snapshots, skipped) = snapshots_from_history(rows);
                if skipped > 0 {
                    debug!(range = range.id(), skipped, "dropped invalid history rows");
                }
                snapshots
            })
    }
}
