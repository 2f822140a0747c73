use crate::identity::UserId;
use crate::seat::{Seat, SeatMap, SeatNo, SeatState};
use crate::status::{normalize_trip_status, SeatStatus};
use crate::trip::Trip;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderProfile {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub rating: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSnapshot {
    pub seat_no: u8,
    pub status: String,
    #[serde(default)]
    pub holder_name: Option<String>,
    #[serde(default)]
    pub holder_client_id: Option<String>,
    #[serde(default)]
    pub locked_by_driver: bool,
    #[serde(default)]
    pub holder_profile: Option<HolderProfile>,
}

impl SeatSnapshot {
    pub fn from_seat(seat: &Seat, profile: Option<HolderProfile>) -> Self {
        Self {
            seat_no: seat.seat_no.get(),
            status: seat.status().as_str().to_string(),
            holder_name: seat
                .holder_name
                .clone()
                .or_else(|| profile.as_ref().map(|p| p.display_name.clone())),
            holder_client_id: seat.holder().map(|h| h.as_str().to_string()),
            locked_by_driver: seat.locked_by_driver(),
            holder_profile: profile,
        }
    }

    /// Validate the holder/status pairing and build the domain seat.
    pub fn into_domain(self) -> CoreResult<Seat> {
        let seat_no = SeatNo::new(self.seat_no)?;
        let status: SeatStatus = self.status.parse()?;
        let holder = self
            .holder_client_id
            .filter(|h| !h.trim().is_empty())
            .map(UserId::new);

        let state = match (status, holder) {
            (SeatStatus::Available, None) => SeatState::Available,
            (SeatStatus::Pending, Some(holder)) => SeatState::Pending { holder },
            (SeatStatus::Booked, Some(holder)) => SeatState::Booked { holder },
            (SeatStatus::Blocked, None) => SeatState::Blocked {
                by_driver: self.locked_by_driver,
            },
            (status, holder) => {
                return Err(CoreError::MalformedSnapshot(format!(
                    "seat {} is {} but holder is {}",
                    seat_no,
                    status,
                    if holder.is_some() { "present" } else { "missing" }
                )))
            }
        };

        if self.locked_by_driver && status != SeatStatus::Blocked {
            return Err(CoreError::MalformedSnapshot(format!(
                "seat {seat_no} is {status} but marked locked by driver"
            )));
        }

        let holder_name = if status.has_holder() {
            self.holder_name
                .or_else(|| self.holder_profile.map(|p| p.display_name))
        } else {
            None
        };

        Ok(Seat {
            seat_no,
            state,
            holder_name,
        })
    }
}

/// Trip as sent by the backend. `status` stays raw until `into_domain`
/// normalizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSnapshot {
    pub id: Uuid,
    pub driver_id: String,
    pub status: String,
    pub departure_time: DateTime<Utc>,
    pub available_seats: u8,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub price_per_seat: i64,
    #[serde(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TripSnapshot {
    pub fn from_trip(trip: &Trip, seats: &SeatMap) -> Self {
        Self {
            id: trip.id,
            driver_id: trip.driver_id.as_str().to_string(),
            status: trip.status.as_str().to_string(),
            departure_time: trip.departure_time,
            // Bounded by the four-seat layout.
            available_seats: seats.available_count() as u8,
            origin: trip.origin.clone(),
            destination: trip.destination.clone(),
            price_per_seat: trip.price_per_seat,
            note: trip.note.clone(),
            created_at: trip.created_at,
        }
    }

    pub fn into_domain(self) -> CoreResult<Trip> {
        if self.driver_id.trim().is_empty() {
            return Err(CoreError::MalformedSnapshot(format!("trip {} has no driver", self.id)));
        }
        Ok(Trip {
            id: self.id,
            driver_id: UserId::new(self.driver_id),
            status: normalize_trip_status(&self.status)?,
            departure_time: self.departure_time,
            origin: self.origin,
            destination: self.destination,
            price_per_seat: self.price_per_seat,
            note: self.note,
            created_at: self.created_at,
        })
    }
}

/// `{ trip, seats[] }` as returned by every trip read and mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEnvelope {
    pub trip: TripSnapshot,
    pub seats: Vec<SeatSnapshot>,
}

impl TripEnvelope {
    pub fn from_domain<F>(trip: &Trip, seats: &SeatMap, mut profile_of: F) -> Self
    where
        F: FnMut(&UserId) -> Option<HolderProfile>,
    {
        Self {
            trip: TripSnapshot::from_trip(trip, seats),
            seats: seats
                .iter()
                .map(|seat| {
                    let profile = seat.holder().and_then(&mut profile_of);
                    SeatSnapshot::from_seat(seat, profile)
                })
                .collect(),
        }
    }

    pub fn into_domain(self) -> CoreResult<(Trip, SeatMap)> {
        let trip = self.trip.into_domain()?;
        let seats = self
            .seats
            .into_iter()
            .map(SeatSnapshot::into_domain)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok((trip, SeatMap::from_seats(seats)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TripStatus;

    const ENVELOPE: &str = r#"
    {
        "trip": {
            "id": "5b1f7f5e-3c39-4a55-9a59-1a4d7a3c2f10",
            "driverId": "drv-1",
            "status": "In-Progress",
            "departureTime": "2026-04-02T06:30:00Z",
            "availableSeats": 1,
            "origin": "Toshkent",
            "destination": "Namangan",
            "createdAt": "2026-04-01T18:00:00Z"
        },
        "seats": [
            { "seatNo": 1, "status": "booked", "holderClientId": "p-1",
              "holderProfile": { "userId": "p-1", "displayName": "Sardor", "avatarUrl": null, "rating": 4.8 } },
            { "seatNo": 2, "status": "pending", "holderClientId": "p-2", "holderName": "Malika" },
            { "seatNo": 3, "status": "blocked", "lockedByDriver": true },
            { "seatNo": 4, "status": "available" }
        ]
    }"#;

    #[test]
    fn test_envelope_normalizes_and_validates() {
        let env: TripEnvelope = serde_json::from_str(ENVELOPE).expect("Failed to deserialize");
        let (trip, seats) = env.into_domain().unwrap();

        assert_eq!(trip.status, TripStatus::InProgress);
        assert_eq!(trip.price_per_seat, 0);
        assert_eq!(trip.created_at.to_rfc3339(), "2026-04-01T18:00:00+00:00");

        let one = seats.get(SeatNo::new(1).unwrap());
        assert_eq!(one.status(), SeatStatus::Booked);
        assert_eq!(one.holder_name.as_deref(), Some("Sardor"));
        assert!(seats.get(SeatNo::new(3).unwrap()).locked_by_driver());
        assert_eq!(seats.available_count(), 1);
    }

    #[test]
    fn test_holder_without_claim_is_malformed() {
        let raw = SeatSnapshot {
            seat_no: 2,
            status: "pending".to_string(),
            holder_name: Some("Malika".to_string()),
            holder_client_id: None,
            locked_by_driver: false,
            holder_profile: None,
        };
        assert!(matches!(raw.into_domain(), Err(CoreError::MalformedSnapshot(_))));

        let stray = SeatSnapshot {
            seat_no: 4,
            status: "available".to_string(),
            holder_name: None,
            holder_client_id: Some("p-9".to_string()),
            locked_by_driver: false,
            holder_profile: None,
        };
        assert!(matches!(stray.into_domain(), Err(CoreError::MalformedSnapshot(_))));
    }

    #[test]
    fn test_missing_created_at_is_rejected() {
        let mut raw: serde_json::Value = serde_json::from_str(ENVELOPE).unwrap();
        raw["trip"].as_object_mut().unwrap().remove("createdAt");
        assert!(serde_json::from_value::<TripEnvelope>(raw).is_err());
    }

    #[test]
    fn test_unknown_trip_status_is_rejected() {
        let mut env: TripEnvelope = serde_json::from_str(ENVELOPE).unwrap();
        env.trip.status = "paused".to_string();
        assert_eq!(
            env.into_domain().unwrap_err(),
            CoreError::UnknownStatus("paused".to_string())
        );
    }

    #[test]
    fn test_from_domain_emits_camel_case() {
        let env: TripEnvelope = serde_json::from_str(ENVELOPE).unwrap();
        let (trip, seats) = env.into_domain().unwrap();
        let out = TripEnvelope::from_domain(&trip, &seats, |_| None);

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["trip"]["status"], "in_progress");
        assert_eq!(json["trip"]["availableSeats"], 1);
        assert_eq!(json["seats"][2]["lockedByDriver"], true);
        assert_eq!(json["seats"][1]["holderClientId"], "p-2");
        assert!(json["seats"][3]["holderClientId"].is_null());
    }
}
