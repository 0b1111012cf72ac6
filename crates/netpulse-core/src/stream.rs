// ── Series subscriptions ──
//
// Read-only views of the series for consumers. Each update replaces the
// whole ordered snapshot; nothing hands out a mutable reference.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::SeriesPoint;

/// Subscription to the dashboard series.
pub struct SeriesSubscription {
    current: Arc<[SeriesPoint]>,
    receiver: watch::Receiver<Arc<[SeriesPoint]>>,
}

impl SeriesSubscription {
    pub(crate) fn new(receiver: watch::Receiver<Arc<[SeriesPoint]>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The series as of creation or the last `changed()`.
    pub fn current(&self) -> &Arc<[SeriesPoint]> {
        &self.current
    }

    pub fn latest(&self) -> Arc<[SeriesPoint]> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update. `None` once the dashboard is gone.
    pub async fn changed(&mut self) -> Option<Arc<[SeriesPoint]>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> SeriesStream {
        SeriesStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each new series snapshot, starting with the
/// current one.
pub struct SeriesStream {
    inner: WatchStream<Arc<[SeriesPoint]>>,
}

impl Stream for SeriesStream {
    type Item = Arc<[SeriesPoint]>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
