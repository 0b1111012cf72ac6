// ── Event bus ──
//
// Broadcast channel of dashboard events for summary widgets. Slow
// subscribers lose the oldest events and are told how many they missed.

use std::sync::Arc;

use strum::{Display, EnumString, IntoStaticStr};
use tokio::sync::broadcast;
use tracing::{trace, warn};

use netpulse_api::OutcomeKind;

use crate::model::{Mode, Snapshot, SourceKind};

/// Event names as published to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum EventKind {
    #[strum(serialize = "snapshot:update")]
    SnapshotUpdate,
    #[strum(serialize = "waiting")]
    Waiting,
    #[strum(serialize = "no_data")]
    NoData,
    #[strum(serialize = "error")]
    Error,
    #[strum(serialize = "device:change")]
    DeviceChange,
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A live snapshot was accepted into the series.
    SnapshotUpdate(Arc<Snapshot>),
    /// The appliance answered but has no data yet.
    Waiting { message: String },
    /// A load succeeded with nothing to show.
    NoData { mode: Mode },
    /// A request failed. `source` is the mode the request was made for.
    Error {
        kind: OutcomeKind,
        source: SourceKind,
        message: String,
    },
    DeviceChange { device: Option<String> },
}

impl DashboardEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SnapshotUpdate(_) => EventKind::SnapshotUpdate,
            Self::Waiting { .. } => EventKind::Waiting,
            Self::NoData { .. } => EventKind::NoData,
            Self::Error { .. } => EventKind::Error,
            Self::DeviceChange { .. } => EventKind::DeviceChange,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().into()
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: DashboardEvent) {
        let name = event.name();
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(event = name, delivered, "event published");
    }

    /// Receive every event.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Receive events of one kind only.
    pub fn subscribe_to(&self, kind: EventKind) -> EventSubscription {
        EventSubscription {
            kind,
            rx: self.tx.subscribe(),
        }
    }
}

/// Filtered subscription returned by [`EventBus::subscribe_to`].
#[derive(Debug)]
pub struct EventSubscription {
    kind: EventKind,
    rx: broadcast::Receiver<DashboardEvent>,
}

impl EventSubscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Next matching event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<DashboardEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.kind() == self.kind => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(kind = %self.kind, skipped, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
