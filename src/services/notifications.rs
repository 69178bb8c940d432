use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::Notice;

const SUBSCRIBER_BUFFER: usize = 16;

/// Receives the notices produced by list operations.
///
/// Fire-and-forget: implementations must not block and there is no ordering
/// guarantee between notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// A notice as displayed to the user
#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub id: Uuid,
    #[serde(flatten)]
    pub notice: Notice,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    shown_at: Instant,
}

/// Bounded queue of auto-expiring toasts.
///
/// Newest toasts come first. Once `limit` toasts are visible the oldest is
/// dropped, and toasts older than `ttl` disappear on their own. Every toast is
/// also published to subscribers.
pub struct ToastQueue {
    toasts: Mutex<VecDeque<Toast>>,
    limit: usize,
    ttl: Duration,
    publisher: broadcast::Sender<Toast>,
}

impl ToastQueue {
    pub fn new(limit: usize, ttl: Duration) -> Self {
        let (publisher, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            toasts: Mutex::new(VecDeque::new()),
            limit: limit.max(1),
            ttl,
            publisher,
        }
    }

    /// Visible toasts, newest first
    pub fn active(&self) -> Vec<Toast> {
        let mut toasts = self.lock();
        Self::expire(&mut toasts, self.ttl);
        toasts.iter().cloned().collect()
    }

    /// Removes a toast before it expires. Returns whether it was visible.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut toasts = self.lock();
        let before = toasts.len();
        toasts.retain(|toast| toast.id != id);
        toasts.len() != before
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Receives every toast pushed after this call.
    ///
    /// Slow subscribers skip messages rather than holding up the queue.
    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.publisher.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Toast>> {
        self.toasts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(toasts: &mut VecDeque<Toast>, ttl: Duration) {
        toasts.retain(|toast| toast.shown_at.elapsed() < ttl);
    }
}

impl NotificationSink for ToastQueue {
    fn notify(&self, notice: Notice) {
        let toast = Toast {
            id: Uuid::new_v4(),
            notice,
            created_at: Utc::now(),
            shown_at: Instant::now(),
        };

        {
            let mut toasts = self.lock();
            Self::expire(&mut toasts, self.ttl);
            toasts.push_front(toast.clone());
            toasts.truncate(self.limit);
        }

        tracing::debug!(
            toast_id = %toast.id,
            title = %toast.notice.title,
            severity = ?toast.notice.severity,
            "Toast queued"
        );

        // No subscribers is fine
        let _ = self.publisher.send(toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn queue(limit: usize) -> ToastQueue {
        ToastQueue::new(limit, Duration::from_secs(60))
    }

    #[test]
    fn test_newest_first() {
        let toasts = queue(3);
        toasts.notify(Notice::success("Added to watchlist", "first"));
        toasts.notify(Notice::success("Added to favorites", "second"));

        let active = toasts.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].notice.title, "Added to favorites");
        assert_eq!(active[1].notice.title, "Added to watchlist");
    }

    #[test]
    fn test_limit_drops_oldest() {
        let toasts = queue(2);
        toasts.notify(Notice::info("one", ""));
        toasts.notify(Notice::info("two", ""));
        toasts.notify(Notice::info("three", ""));

        let titles: Vec<String> = toasts
            .active()
            .into_iter()
            .map(|t| t.notice.title)
            .collect();
        assert_eq!(titles, vec!["three", "two"]);
    }

    #[test]
    fn test_zero_limit_still_shows_one() {
        let toasts = queue(0);
        toasts.notify(Notice::info("only", ""));
        assert_eq!(toasts.active().len(), 1);
    }

    #[test]
    fn test_expired_toasts_disappear() {
        let toasts = ToastQueue::new(3, Duration::ZERO);
        toasts.notify(Notice::warning("Saved locally", ""));
        assert!(toasts.active().is_empty());
    }

    #[test]
    fn test_dismiss() {
        let toasts = queue(3);
        toasts.notify(Notice::info("keep", ""));
        toasts.notify(Notice::info("drop", ""));

        let id = toasts.active()[0].id;
        assert!(toasts.dismiss(id));
        assert!(!toasts.dismiss(id));
        assert_eq!(toasts.active().len(), 1);
        assert_eq!(toasts.active()[0].notice.title, "keep");

        toasts.clear();
        assert!(toasts.active().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_receive_toasts() {
        let toasts = queue(3);
        let mut rx = toasts.subscribe();

        toasts.notify(Notice::warning("Offline mode", "using saved lists"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.notice.title, "Offline mode");
        assert_eq!(received.notice.severity, Severity::Warning);
    }

    #[test]
    fn test_toast_serializes_flat() {
        let toasts = queue(3);
        toasts.notify(Notice::success("Added to favorites", "Fight Club"));

        let value = serde_json::to_value(&toasts.active()[0]).unwrap();
        assert_eq!(value["title"], "Added to favorites");
        assert_eq!(value["description"], "Fight Club");
        assert_eq!(value["severity"], "success");
        assert!(value.get("id").is_some());
        assert!(value.get("shown_at").is_none());
    }
}
