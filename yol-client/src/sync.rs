use crate::error::ClientError;
use crate::http::BackendClient;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use yol_core::UserId;
use yol_store::app_config::SyncConfig;
use yol_store::Notification;

/// Platform notification service.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications to the log instead of a device tray.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn post(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::info!(
            id = notification.id,
            kind = ?notification.kind,
            trip_id = %notification.trip_id,
            seat_no = ?notification.seat_no,
            "{}",
            notification.message
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No session; nothing was fetched.
    SignedOut,
    Delivered(usize),
}

#[derive(Debug)]
struct Cursor {
    user: UserId,
    after: u64,
}

/// One unit of work: fetch everything after the last delivered id and hand
/// each item to the [`Notifier`] once.
pub struct NotificationSync {
    backend: Arc<BackendClient>,
    notifier: Arc<dyn Notifier>,
    cursor: Mutex<Option<Cursor>>,
}

impl NotificationSync {
    pub fn new(backend: Arc<BackendClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            cursor: Mutex::new(None),
        }
    }

    pub async fn run_once(&self) -> Result<SyncOutcome, ClientError> {
        let Some(session) = self.backend.session().await else {
            return Ok(SyncOutcome::SignedOut);
        };

        // Held for the whole unit so overlapping runs cannot deliver twice.
        let mut cursor = self.cursor.lock().await;
        if cursor.as_ref().map(|c| &c.user) != Some(&session.user_id) {
            *cursor = Some(Cursor {
                user: session.user_id.clone(),
                after: 0,
            });
        }
        let after = cursor.as_ref().map_or(0, |c| c.after);

        let items = match self.backend.notifications(after).await {
            Ok(items) => items,
            Err(ClientError::Unauthenticated) => {
                tracing::debug!("session expired, skipping notification sync");
                return Ok(SyncOutcome::SignedOut);
            }
            Err(err) => return Err(err),
        };

        let mut delivered = 0;
        for item in items.iter().filter(|n| n.id > after) {
            self.notifier
                .post(item)
                .await
                .map_err(|e| ClientError::Delivery(e.to_string()))?;
            if let Some(c) = cursor.as_mut() {
                c.after = item.id;
            }
            delivered += 1;
        }

        if delivered > 0 {
            tracing::info!(user_id = %session.user_id, delivered, "notifications delivered");
        }
        Ok(SyncOutcome::Delivered(delivered))
    }
}

/// Repeats [`NotificationSync::run_once`] every `interval`; a failed unit is
/// retried after `retry`.
#[derive(Debug, Clone, Copy)]
pub struct SyncScheduler {
    pub interval: Duration,
    pub retry: Duration,
}

impl SyncScheduler {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_seconds),
            retry: Duration::from_secs(config.retry_seconds),
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, sync: Arc<NotificationSync>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval = ?self.interval, retry = ?self.retry, "notification sync started");

        loop {
            let delay = match sync.run_once().await {
                Ok(_) => self.interval,
                Err(err) => {
                    tracing::warn!(error = %err, "notification sync failed, retrying");
                    self.retry
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("notification sync stopped");
    }

    pub fn spawn(self, sync: Arc<NotificationSync>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(sync, shutdown))
    }
}
