use crate::authority::SeatAction;
use crate::identity::Identity;
use crate::seat::{SeatMap, SeatNo, SeatState};
use crate::snapshot::TripEnvelope;
use crate::status::TripStatus;
use crate::trip::Trip;
use crate::CoreResult;
use chrono::{DateTime, Utc};

/// Trip and seats as last confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripView {
    pub trip: Trip,
    pub seats: SeatMap,
    pub confirmed_at: DateTime<Utc>,
}

impl TripView {
    pub fn from_envelope(envelope: TripEnvelope, confirmed_at: DateTime<Utc>) -> CoreResult<Self> {
        let (trip, seats) = envelope.into_domain()?;
        Ok(Self {
            trip,
            seats,
            confirmed_at,
        })
    }

    /// Replace the whole view with a newer authoritative snapshot.
    ///
    /// A malformed snapshot leaves the current view untouched.
    pub fn replace(&mut self, envelope: TripEnvelope, confirmed_at: DateTime<Utc>) -> CoreResult<()> {
        *self = Self::from_envelope(envelope, confirmed_at)?;
        Ok(())
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.trip.is_locked(now)
    }

    /// Classify a confirmed response against what `actor` asked for.
    pub fn outcome(&self, actor: &Identity, seat_no: SeatNo, action: SeatAction) -> ActionOutcome {
        let seat = self.seats.get(seat_no);
        let mine = seat.holder().is_some_and(|h| actor.is(h));

        let applied = match action {
            SeatAction::Request => matches!(seat.state, SeatState::Pending { .. } | SeatState::Booked { .. }) && mine,
            SeatAction::Cancel | SeatAction::Reject | SeatAction::Unblock => {
                matches!(seat.state, SeatState::Available)
            }
            SeatAction::Approve => matches!(seat.state, SeatState::Booked { .. }),
            SeatAction::Block => seat.locked_by_driver(),
        };

        if applied {
            ActionOutcome::Applied
        } else if action == SeatAction::Request && seat.holder().is_some() {
            ActionOutcome::SeatTaken {
                holder_name: seat.holder_name.clone(),
            }
        } else {
            ActionOutcome::NotApplied
        }
    }

    /// Outcome of a lifecycle call: whether the trip now sits at `expected`.
    pub fn trip_outcome(&self, expected: TripStatus) -> ActionOutcome {
        if self.trip.status == expected {
            ActionOutcome::Applied
        } else {
            ActionOutcome::NotApplied
        }
    }
}

/// What the authority's response means for the actor's intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// Another passenger won the seat first; a normal result, not an error.
    SeatTaken { holder_name: Option<String> },
    NotApplied,
}
