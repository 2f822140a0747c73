use std::sync::Arc;
use tokio::sync::broadcast;
use yol_core::{Clock, SeatMap, Trip, TripEnvelope};
use yol_store::app_config::BusinessRules;
use yol_store::{NotificationLog, TripRecord, TripStore, UserDirectory};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub trips: Arc<TripStore>,
    pub users: Arc<UserDirectory>,
    pub notifications: Arc<NotificationLog>,
    pub clock: Arc<dyn Clock>,
    pub trip_tx: broadcast::Sender<TripEnvelope>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

impl AppState {
    pub fn new(auth: AuthConfig, business_rules: BusinessRules, clock: Arc<dyn Clock>) -> Self {
        let (trip_tx, _) = broadcast::channel(100);
        Self {
            trips: Arc::new(TripStore::new()),
            users: Arc::new(UserDirectory::new()),
            notifications: Arc::new(NotificationLog::new()),
            clock,
            trip_tx,
            auth,
            business_rules,
        }
    }

    /// Render a trip with holder profiles filled in from the user directory.
    pub async fn envelope(&self, trip: &Trip, seats: &SeatMap) -> TripEnvelope {
        let profiles = self.users.profiles().await;
        TripEnvelope::from_domain(trip, seats, |id| profiles.get(id).cloned())
    }

    /// Envelope for a changed trip, also pushed to live subscribers.
    pub async fn publish(&self, record: &TripRecord) -> TripEnvelope {
        let envelope = self.envelope(&record.trip, &record.seats).await;
        // No subscribers is fine.
        let _ = self.trip_tx.send(envelope.clone());
        envelope
    }
}
