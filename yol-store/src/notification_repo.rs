use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use yol_core::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SeatRequested,
    RequestCancelled,
    RequestApproved,
    RequestRejected,
    TripStarted,
    TripFinished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub trip_id: Uuid,
    pub seat_no: Option<u8>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user append-only inbox. Ids increase strictly across all users, so a
/// client cursor (`after`) never skips or repeats an entry.
#[derive(Debug, Default)]
pub struct NotificationLog {
    inner: RwLock<Inbox>,
}

#[derive(Debug, Default)]
struct Inbox {
    next_id: u64,
    by_user: HashMap<UserId, Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(
        &self,
        recipient: &UserId,
        kind: NotificationKind,
        trip_id: Uuid,
        seat_no: Option<u8>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Notification {
        let mut inbox = self.inner.write().await;
        inbox.next_id += 1;
        let notification = Notification {
            id: inbox.next_id,
            kind,
            trip_id,
            seat_no,
            message: message.into(),
            created_at: now,
        };
        inbox
            .by_user
            .entry(recipient.clone())
            .or_default()
            .push(notification.clone());

        tracing::debug!(recipient = %recipient, id = notification.id, kind = ?kind, "notification queued");
        notification
    }

    /// Entries for `user` with id greater than `after`, oldest first.
    pub async fn since(&self, user: &UserId, after: u64) -> Vec<Notification> {
        self.inner
            .read()
            .await
            .by_user
            .get(user)
            .map(|items| items.iter().filter(|n| n.id > after).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cursor_reads_only_newer_entries() {
        let log = NotificationLog::new();
        let driver = UserId::new("d");
        let rider = UserId::new("p");
        let trip = Uuid::new_v4();

        let first = log.push(&driver, NotificationKind::SeatRequested, trip, Some(2), "Seat 2 requested", Utc::now()).await;
        log.push(&rider, NotificationKind::RequestApproved, trip, Some(2), "Approved", Utc::now()).await;
        let third = log.push(&driver, NotificationKind::RequestCancelled, trip, Some(2), "Cancelled", Utc::now()).await;

        let all = log.since(&driver, 0).await;
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);

        let newer = log.since(&driver, first.id).await;
        assert_eq!(newer, vec![third]);
        assert!(log.since(&UserId::new("nobody"), 0).await.is_empty());
    }
}
