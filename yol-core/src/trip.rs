use crate::identity::UserId;
use crate::seat::{SeatNo, PASSENGER_SEATS};
use crate::status::TripStatus;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single driver-offered ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub driver_id: UserId,
    pub status: TripStatus,
    pub departure_time: DateTime<Utc>,
    pub origin: String,
    pub destination: String,
    /// Price per seat in the smallest currency unit.
    pub price_per_seat: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    /// Booking window closed: the trip has advanced or departure has passed.
    ///
    /// Derived on every call from `now`; never stored.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        is_locked(self, now)
    }

    pub fn is_driver(&self, user: &UserId) -> bool {
        &self.driver_id == user
    }
}

pub fn is_locked(trip: &Trip, now: DateTime<Utc>) -> bool {
    trip.status != TripStatus::Active || now >= trip.departure_time
}

/// Driver's publish request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub price_per_seat: i64,
    #[serde(default)]
    pub note: Option<String>,
    /// Seats the driver keeps closed from the start.
    #[serde(default)]
    pub blocked_seats: Vec<u8>,
}

impl NewTrip {
    /// Check the draft against `now` and the minimum publish lead time.
    pub fn validate(&self, now: DateTime<Utc>, min_lead: Duration) -> CoreResult<Vec<SeatNo>> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(CoreError::Validation("origin and destination are required".to_string()));
        }
        if self.origin.trim().eq_ignore_ascii_case(self.destination.trim()) {
            return Err(CoreError::Validation("origin and destination must differ".to_string()));
        }
        if self.departure_time <= now + min_lead {
            return Err(CoreError::Validation("departure time must be in the future".to_string()));
        }
        if self.price_per_seat < 0 {
            return Err(CoreError::Validation("price must not be negative".to_string()));
        }
        if self.blocked_seats.len() > usize::from(PASSENGER_SEATS) {
            return Err(CoreError::Validation("too many blocked seats".to_string()));
        }

        let mut blocked = Vec::with_capacity(self.blocked_seats.len());
        for n in &self.blocked_seats {
            let seat_no = SeatNo::new(*n)?;
            if !blocked.contains(&seat_no) {
                blocked.push(seat_no);
            }
        }
        Ok(blocked)
    }

    /// Materialize the trip record for `driver` once validated.
    pub fn into_trip(self, driver: UserId, now: DateTime<Utc>) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            driver_id: driver,
            status: TripStatus::Active,
            departure_time: self.departure_time,
            origin: self.origin.trim().to_string(),
            destination: self.destination.trim().to_string(),
            price_per_seat: self.price_per_seat,
            note: self.note.filter(|n| !n.trim().is_empty()),
            created_at: now,
        }
    }
}
