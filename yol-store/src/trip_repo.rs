use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use yol_core::{CoreError, CoreResult, SeatMap, Trip, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRecord {
    pub trip: Trip,
    pub seats: SeatMap,
}

/// Search filter; every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
}

impl TripQuery {
    fn matches(&self, trip: &Trip) -> bool {
        let place = |want: &Option<String>, have: &str| {
            want.as_deref()
                .map(|w| have.to_lowercase().contains(&w.trim().to_lowercase()))
                .unwrap_or(true)
        };
        place(&self.origin, &trip.origin)
            && place(&self.destination, &trip.destination)
            && self
                .date
                .map(|d| trip.departure_time.date_naive() == d)
                .unwrap_or(true)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Trip not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Rejected(#[from] CoreError),
}

/// Authoritative trip storage. Each trip sits behind its own mutex, so two
/// requests for the same free seat produce exactly one winner.
#[derive(Debug, Default)]
pub struct TripStore {
    trips: RwLock<HashMap<Uuid, Arc<Mutex<TripRecord>>>>,
}

impl TripStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: TripRecord) {
        let id = record.trip.id;
        self.trips.write().await.insert(id, Arc::new(Mutex::new(record)));
        tracing::info!(trip_id = %id, "trip stored");
    }

    pub async fn get(&self, id: Uuid) -> Result<TripRecord, StoreError> {
        let slot = self.slot(id).await?;
        let record = slot.lock().await;
        Ok(record.clone())
    }

    /// Run a transition against the current record under the trip's lock.
    ///
    /// The result is persisted only when `f` succeeds; on error the stored
    /// record is unchanged.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<TripRecord, StoreError>
    where
        F: FnOnce(&TripRecord) -> CoreResult<TripRecord>,
    {
        let slot = self.slot(id).await?;
        let mut record = slot.lock().await;

        let next = f(&*record).map_err(|e| {
            tracing::debug!(trip_id = %id, error = %e, "transition rejected");
            StoreError::Rejected(e)
        })?;

        if next.trip.id != record.trip.id || next.trip.driver_id != record.trip.driver_id {
            return Err(StoreError::Rejected(CoreError::Validation(
                "trip identity is immutable".to_string(),
            )));
        }
        if next.trip.status.rank() < record.trip.status.rank() {
            return Err(StoreError::Rejected(CoreError::InvalidTransition {
                from: record.trip.status,
                to: next.trip.status,
                reason: "trip status never regresses",
            }));
        }

        *record = next.clone();
        Ok(next)
    }

    /// Bookable trips: active, still open at `now`, with a free seat.
    pub async fn search(&self, query: &TripQuery, now: DateTime<Utc>, limit: usize) -> Vec<TripRecord> {
        let slots: Vec<_> = self.trips.read().await.values().cloned().collect();

        let mut found = Vec::new();
        for slot in slots {
            let record = slot.lock().await;
            if !record.trip.is_locked(now)
                && record.seats.available_count() > 0
                && query.matches(&record.trip)
            {
                found.push(record.clone());
            }
        }

        found.sort_by_key(|r| r.trip.departure_time);
        found.truncate(limit);
        found
    }

    /// Trips published by `driver`, newest departure first.
    pub async fn by_driver(&self, driver: &UserId) -> Vec<TripRecord> {
        let slots: Vec<_> = self.trips.read().await.values().cloned().collect();

        let mut found = Vec::new();
        for slot in slots {
            let record = slot.lock().await;
            if &record.trip.driver_id == driver {
                found.push(record.clone());
            }
        }
        found.sort_by(|a, b| b.trip.departure_time.cmp(&a.trip.departure_time));
        found
    }

    async fn slot(&self, id: Uuid) -> Result<Arc<Mutex<TripRecord>>, StoreError> {
        self.trips
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}
