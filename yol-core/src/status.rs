use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trip lifecycle: `active` → `in_progress` → `finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Active,
    InProgress,
    Finished,
}

impl TripStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::InProgress => "in_progress",
            TripStatus::Finished => "finished",
        }
    }

    /// Position in the lifecycle; transitions only ever increase it by one.
    pub const fn rank(&self) -> u8 {
        match self {
            TripStatus::Active => 0,
            TripStatus::InProgress => 1,
            TripStatus::Finished => 2,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Finished)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        normalize_trip_status(raw)
    }
}

/// Map every spelling the backend is known to send onto the closed enum.
///
/// Case, surrounding whitespace and the separators `-`, `_` and space are
/// ignored, so `"In-Progress"`, `"in_progress"` and `"inprogress"` agree.
pub fn normalize_trip_status(raw: &str) -> CoreResult<TripStatus> {
    let key: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect();

    match key.as_str() {
        "active" => Ok(TripStatus::Active),
        "inprogress" | "started" => Ok(TripStatus::InProgress),
        "finished" | "done" | "completed" => Ok(TripStatus::Finished),
        _ => Err(CoreError::UnknownStatus(raw.to_string())),
    }
}

/// Per-seat status as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Available,
    Pending,
    Booked,
    Blocked,
}

impl SeatStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "available",
            SeatStatus::Pending => "pending",
            SeatStatus::Booked => "booked",
            SeatStatus::Blocked => "blocked",
        }
    }

    /// Whether a holder identity accompanies this status.
    pub const fn has_holder(&self) -> bool {
        matches!(self, SeatStatus::Pending | SeatStatus::Booked)
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatStatus {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(SeatStatus::Available),
            "pending" => Ok(SeatStatus::Pending),
            "booked" => Ok(SeatStatus::Booked),
            "blocked" => Ok(SeatStatus::Blocked),
            _ => Err(CoreError::UnknownStatus(raw.to_string())),
        }
    }
}
