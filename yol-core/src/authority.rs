use crate::identity::{Identity, UserId};
use crate::seat::Seat;
use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Driver,
    Passenger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatAction {
    Request,
    Cancel,
    Approve,
    Reject,
    Block,
    Unblock,
}

impl SeatAction {
    pub const ALL: [SeatAction; 6] = [
        SeatAction::Request,
        SeatAction::Cancel,
        SeatAction::Approve,
        SeatAction::Reject,
        SeatAction::Block,
        SeatAction::Unblock,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SeatAction::Request => "request",
            SeatAction::Cancel => "cancel",
            SeatAction::Approve => "approve",
            SeatAction::Reject => "reject",
            SeatAction::Block => "block",
            SeatAction::Unblock => "unblock",
        }
    }

    pub const fn role(&self) -> Role {
        match self {
            SeatAction::Request | SeatAction::Cancel => Role::Passenger,
            SeatAction::Approve | SeatAction::Reject | SeatAction::Block | SeatAction::Unblock => {
                Role::Driver
            }
        }
    }
}

impl fmt::Display for SeatAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeatAction {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        SeatAction::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| CoreError::Validation(format!("unknown seat action: {raw}")))
    }
}

/// Resolve permission for `actor` to perform `action` on `seat`.
///
/// Driver actions need the trip's driver; `request` needs anyone but the
/// driver; `cancel` needs the seat's current holder. `unblock` additionally
/// needs the block to have come from the driver.
pub fn authorize(
    trip_driver: &UserId,
    actor: &Identity,
    seat: &Seat,
    action: SeatAction,
) -> CoreResult<()> {
    let is_driver = actor.is(trip_driver);

    match action {
        SeatAction::Request if is_driver => Err(CoreError::Unauthorized(
            "drivers cannot request seats on their own trip".to_string(),
        )),
        SeatAction::Request => Ok(()),
        SeatAction::Cancel => match seat.holder() {
            Some(holder) if actor.is(holder) => Ok(()),
            _ => Err(CoreError::Unauthorized(format!(
                "only the holder of seat {} may cancel it",
                seat.seat_no
            ))),
        },
        SeatAction::Approve | SeatAction::Reject | SeatAction::Block if !is_driver => Err(
            CoreError::Unauthorized(format!("only the driver may {action} seats")),
        ),
        SeatAction::Approve | SeatAction::Reject | SeatAction::Block => Ok(()),
        SeatAction::Unblock if !is_driver => Err(CoreError::Unauthorized(
            "only the driver may unblock seats".to_string(),
        )),
        SeatAction::Unblock if !seat.locked_by_driver() => Err(CoreError::Unauthorized(format!(
            "seat {} was not blocked by the driver",
            seat.seat_no
        ))),
        SeatAction::Unblock => Ok(()),
    }
}
