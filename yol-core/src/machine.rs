use crate::authority::{authorize, SeatAction};
use crate::identity::Identity;
use crate::seat::{Seat, SeatMap, SeatNo, SeatState};
use crate::status::{SeatStatus, TripStatus};
use crate::trip::Trip;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Apply a seat action by `actor` against the trip's current seats.
///
/// Checks run in order: trip lock, authorization, source state.
pub fn apply_seat_action(
    trip: &Trip,
    seats: &SeatMap,
    actor: &Identity,
    seat_no: SeatNo,
    action: SeatAction,
    now: DateTime<Utc>,
) -> CoreResult<SeatMap> {
    if trip.is_locked(now) {
        return Err(CoreError::TripLocked);
    }

    let seat = seats.get(seat_no);
    authorize(&trip.driver_id, actor, seat, action)?;

    let next = match (&seat.state, action) {
        (SeatState::Available, SeatAction::Request) => Seat {
            seat_no,
            state: SeatState::Pending {
                holder: actor.user_id().clone(),
            },
            holder_name: actor.display_name().map(str::to_string),
        },
        (SeatState::Pending { .. }, SeatAction::Cancel | SeatAction::Reject) => {
            Seat::available(seat_no)
        }
        (SeatState::Pending { holder }, SeatAction::Approve) => Seat {
            seat_no,
            state: SeatState::Booked {
                holder: holder.clone(),
            },
            holder_name: seat.holder_name.clone(),
        },
        (SeatState::Available, SeatAction::Block) => Seat {
            seat_no,
            state: SeatState::Blocked { by_driver: true },
            holder_name: None,
        },
        (SeatState::Blocked { by_driver: true }, SeatAction::Unblock) => Seat::available(seat_no),
        (state, _) => {
            return Err(CoreError::SeatUnavailable {
                seat_no: seat_no.get(),
                status: state.status(),
            })
        }
    };

    tracing::debug!(
        trip_id = %trip.id,
        seat_no = seat_no.get(),
        action = %action,
        from = %seat.status(),
        to = %next.status(),
        "seat transition accepted"
    );

    Ok(seats.with_seat(next))
}

/// `active` → `in_progress`, driver only, not before departure.
pub fn start_trip(trip: &Trip, actor: &Identity, now: DateTime<Utc>) -> CoreResult<Trip> {
    if trip.status != TripStatus::Active {
        return Err(CoreError::InvalidTransition {
            from: trip.status,
            to: TripStatus::InProgress,
            reason: "trip is not active",
        });
    }
    if now < trip.departure_time {
        return Err(CoreError::InvalidTransition {
            from: trip.status,
            to: TripStatus::InProgress,
            reason: "departure time not reached",
        });
    }
    ensure_driver(trip, actor)?;

    Ok(Trip {
        status: TripStatus::InProgress,
        ..trip.clone()
    })
}

/// `in_progress` → `finished`, driver only.
pub fn finish_trip(trip: &Trip, actor: &Identity, _now: DateTime<Utc>) -> CoreResult<Trip> {
    if trip.status != TripStatus::InProgress {
        return Err(CoreError::InvalidTransition {
            from: trip.status,
            to: TripStatus::Finished,
            reason: "trip is not in progress",
        });
    }
    ensure_driver(trip, actor)?;

    Ok(Trip {
        status: TripStatus::Finished,
        ..trip.clone()
    })
}

fn ensure_driver(trip: &Trip, actor: &Identity) -> CoreResult<()> {
    if trip.is_driver(actor.user_id()) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized(
            "only the driver may change the trip status".to_string(),
        ))
    }
}

/// Conditions the driver must acknowledge before starting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartWarning {
    NoBookedPassengers,
}

impl std::fmt::Display for StartWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartWarning::NoBookedPassengers => f.write_str("no passengers are booked on this trip"),
        }
    }
}

/// A confirmation step, not a transition rule: starting stays valid either way.
pub fn start_warning(seats: &SeatMap) -> Option<StartWarning> {
    if seats.count(SeatStatus::Booked) == 0 {
        Some(StartWarning::NoBookedPassengers)
    } else {
        None
    }
}
