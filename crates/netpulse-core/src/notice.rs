// ── Notice board ──
//
// At most one user-visible banner at a time. Each banner clears itself
// after the TTL unless a newer banner has replaced it in the meantime.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct NoticeBoard {
    inner: Arc<NoticeInner>,
}

#[derive(Debug)]
struct NoticeInner {
    tx: watch::Sender<Option<Notice>>,
    generation: AtomicU64,
    ttl: Duration,
    cancel: CancellationToken,
}

impl NoticeBoard {
    pub fn new(ttl: Duration, cancel: CancellationToken) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(NoticeInner {
                tx,
                generation: AtomicU64::new(0),
                ttl,
                cancel,
            }),
        }
    }

    /// Replace the current banner and arm its dismiss timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%level, text = %message, "notice shown");
        self.inner.tx.send_replace(Some(Notice { level, message }));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = inner.cancel.cancelled() => {}
                () = tokio::time::sleep(inner.ttl) => {
                    inner.tx.send_if_modified(|current| {
                        if current.is_some()
                            && inner.generation.load(Ordering::SeqCst) == generation
                        {
                            *current = None;
                            true
                        } else {
                            false
                        }
                    });
                }
            }
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(NoticeLevel::Error, message);
    }

    /// Clear the banner now.
    pub fn dismiss(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<Notice> {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Notice>> {
        self.inner.tx.subscribe()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> NoticeBoard {
        NoticeBoard::new(Duration::from_secs(5), CancellationToken::new())
    }

    fn message(board: &NoticeBoard) -> Option<String> {
        board.current().map(|n| n.message)
    }

    #[tokio::test(start_paused = true)]
    async fn banner_dismisses_after_ttl() {
        let board = board();
        board.error("poll failed");
        assert_eq!(
            board.current().map(|n| n.level),
            Some(NoticeLevel::Error)
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(message(&board).as_deref(), Some("poll failed"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(message(&board), None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_banner_survives_older_timer() {
        let board = board();
        board.warning("first");
        tokio::time::sleep(Duration::from_secs(3)).await;
        board.info("second");

        // First timer fires at 5s and must leave "second" alone.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(message(&board).as_deref(), Some("second"));

        // Second timer fires at 8s.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(message(&board), None);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_changes() {
        let board = board();
        let mut rx = board.subscribe();
        board.info("waiting for data");
        rx.changed().await.expect("board alive");
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|n| n.message.clone()),
            Some("waiting for data".to_owned())
        );
        board.dismiss();
        rx.changed().await.expect("board alive");
        assert!(rx.borrow().is_none());
    }
}
