use crate::identity::UserId;
use crate::status::SeatStatus;
use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of passenger seats on every trip (driver seat not counted).
pub const PASSENGER_SEATS: u8 = 4;

/// Passenger seat number: #1 is the front passenger seat, #2–#4 the rear bench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SeatNo(u8);

impl SeatNo {
    pub fn new(n: u8) -> CoreResult<Self> {
        if (1..=PASSENGER_SEATS).contains(&n) {
            Ok(Self(n))
        } else {
            Err(CoreError::SeatNotFound(n))
        }
    }

    pub const fn get(&self) -> u8 {
        self.0
    }

    pub const fn is_front(&self) -> bool {
        self.0 == 1
    }

    pub fn all() -> impl Iterator<Item = SeatNo> {
        (1..=PASSENGER_SEATS).map(SeatNo)
    }

    fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for SeatNo {
    type Error = CoreError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        SeatNo::new(n)
    }
}

impl From<SeatNo> for u8 {
    fn from(seat_no: SeatNo) -> u8 {
        seat_no.0
    }
}

impl fmt::Display for SeatNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seat state with the holder carried only where it can exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeatState {
    Available,
    Pending { holder: UserId },
    Booked { holder: UserId },
    Blocked { by_driver: bool },
}

impl SeatState {
    pub fn status(&self) -> SeatStatus {
        match self {
            SeatState::Available => SeatStatus::Available,
            SeatState::Pending { .. } => SeatStatus::Pending,
            SeatState::Booked { .. } => SeatStatus::Booked,
            SeatState::Blocked { .. } => SeatStatus::Blocked,
        }
    }

    pub fn holder(&self) -> Option<&UserId> {
        match self {
            SeatState::Pending { holder } | SeatState::Booked { holder } => Some(holder),
            _ => None,
        }
    }

    pub fn locked_by_driver(&self) -> bool {
        matches!(self, SeatState::Blocked { by_driver: true })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub seat_no: SeatNo,
    pub state: SeatState,
    /// Display label of the holder, cached from their profile.
    pub holder_name: Option<String>,
}

impl Seat {
    pub fn available(seat_no: SeatNo) -> Self {
        Self {
            seat_no,
            state: SeatState::Available,
            holder_name: None,
        }
    }

    pub fn status(&self) -> SeatStatus {
        self.state.status()
    }

    pub fn holder(&self) -> Option<&UserId> {
        self.state.holder()
    }

    pub fn locked_by_driver(&self) -> bool {
        self.state.locked_by_driver()
    }
}

/// The fixed four-seat layout of one trip, ordered by seat number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    seats: [Seat; PASSENGER_SEATS as usize],
}

impl SeatMap {
    /// All seats available, as on a freshly published trip.
    pub fn new() -> Self {
        Self {
            seats: [1, 2, 3, 4].map(|n| Seat::available(SeatNo(n))),
        }
    }

    /// Build from exactly one seat per number, in any order.
    pub fn from_seats(seats: Vec<Seat>) -> CoreResult<Self> {
        if seats.len() != usize::from(PASSENGER_SEATS) {
            return Err(CoreError::MalformedSnapshot(format!(
                "expected {} seats, got {}",
                PASSENGER_SEATS,
                seats.len()
            )));
        }

        let mut slots: [Option<Seat>; PASSENGER_SEATS as usize] = Default::default();
        for seat in seats {
            let slot = &mut slots[seat.seat_no.index()];
            if slot.is_some() {
                return Err(CoreError::MalformedSnapshot(format!(
                    "duplicate seat {}",
                    seat.seat_no
                )));
            }
            *slot = Some(seat);
        }

        let mut out = Self::new();
        for (i, slot) in slots.into_iter().enumerate() {
            // Length and uniqueness checked above, so every slot is filled.
            if let Some(seat) = slot {
                out.seats[i] = seat;
            }
        }
        Ok(out)
    }

    pub fn get(&self, seat_no: SeatNo) -> &Seat {
        &self.seats[seat_no.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter()
    }

    /// Copy with one seat replaced.
    pub fn with_seat(&self, seat: Seat) -> Self {
        let mut next = self.clone();
        let idx = seat.seat_no.index();
        next.seats[idx] = seat;
        next
    }

    pub fn count(&self, status: SeatStatus) -> usize {
        self.seats.iter().filter(|s| s.status() == status).count()
    }

    pub fn available_count(&self) -> usize {
        self.count(SeatStatus::Available)
    }

    pub fn booked_count(&self) -> usize {
        self.count(SeatStatus::Booked)
    }

    /// Seats awaiting the driver's decision.
    pub fn pending_requests(&self) -> Vec<&Seat> {
        self.seats
            .iter()
            .filter(|s| s.status() == SeatStatus::Pending)
            .collect()
    }

    /// Seats held (pending or booked) by the given passenger.
    pub fn held_by<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a Seat> + 'a {
        self.seats.iter().filter(move |s| s.holder() == Some(user))
    }
}

impl Default for SeatMap {
    fn default() -> Self {
        Self::new()
    }
}
