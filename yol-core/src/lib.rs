pub mod clock;
pub mod status;
pub mod identity;
pub mod seat;
pub mod trip;
pub mod authority;
pub mod machine;
pub mod snapshot;
pub mod reconcile;

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{Identity, UserId};
pub use status::{SeatStatus, TripStatus};
pub use seat::{Seat, SeatMap, SeatNo, SeatState};
pub use trip::{NewTrip, Trip};
pub use authority::{Role, SeatAction};
pub use machine::{apply_seat_action, finish_trip, start_trip, start_warning, StartWarning};
pub use snapshot::{HolderProfile, SeatSnapshot, TripEnvelope, TripSnapshot};
pub use reconcile::{ActionOutcome, TripView};

/// Local validation failures of the trip & seat engine.
///
/// These are raised before any request leaves the device and are also the
/// rejection reasons reported by the authoritative backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: TripStatus,
        to: TripStatus,
        reason: &'static str,
    },

    #[error("Seat {seat_no} is unavailable (currently {status})")]
    SeatUnavailable {
        seat_no: u8,
        status: SeatStatus,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Trip is locked for seat changes")]
    TripLocked,

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Seat not found: {0}")]
    SeatNotFound(u8),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
