//! Rooms and the holds placed on them.

use common::{DateRange, HotelId, RoomDto, RoomId};
use serde::Serialize;

/// A bookable room.
///
/// `available` is an administrative switch; whether the room is taken for a
/// given stay is decided solely by the holds recorded against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: HotelId,
    pub number: Option<String>,
    pub available: bool,
    /// Number of holds ever placed minus holds released, never below zero.
    pub times_booked: u64,
}

impl From<Room> for RoomDto {
    fn from(room: Room) -> Self {
        RoomDto {
            room_id: room.id,
            hotel_id: room.hotel_id,
            number: room.number,
            available: room.available,
            times_booked: room.times_booked,
        }
    }
}

/// Data needed to register a room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub hotel_id: HotelId,
    pub number: Option<String>,
    pub available: bool,
    pub times_booked: u64,
}

impl NewRoom {
    /// An available, never booked room.
    pub fn new(hotel_id: HotelId, number: impl Into<String>) -> Self {
        Self {
            hotel_id,
            number: Some(number.into()),
            available: true,
            times_booked: 0,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_times_booked(mut self, times_booked: u64) -> Self {
        self.times_booked = times_booked;
        self
    }
}

/// A reservation of a room for a stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomHold {
    pub id: i64,
    pub room_id: RoomId,
    pub range: DateRange,
    /// Idempotency key, unique across all holds.
    pub request_id: String,
    /// Booking that asked for the hold, as an opaque correlation string.
    pub booking_id: String,
}

/// A hold about to be placed.
#[derive(Debug, Clone)]
pub struct NewHold {
    pub room_id: RoomId,
    pub range: DateRange,
    pub request_id: String,
    pub booking_id: String,
}

/// Why a hold could not be placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The room is switched off administratively.
    RoomDisabled,
    /// Another hold covers part of the stay.
    Overlapping { request_id: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::RoomDisabled => write!(f, "room disabled"),
            Rejection::Overlapping { request_id } => {
                write!(f, "overlaps hold for request {request_id}")
            }
        }
    }
}

/// Result of trying to place a hold under the room lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOutcome {
    /// A new hold was recorded and the room's load counter incremented.
    Placed(RoomHold),
    /// A hold with the same request id already existed; nothing changed.
    Replayed(RoomHold),
    /// The room is unavailable for the stay; nothing changed.
    Rejected(Rejection),
}

impl HoldOutcome {
    /// Returns true if the room is held for the request after this call.
    pub fn is_held(&self) -> bool {
        !matches!(self, HoldOutcome::Rejected(_))
    }
}

/// Per-room load statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub room_id: RoomId,
    pub room_number: Option<String>,
    pub hotel_id: HotelId,
    pub times_booked: u64,
    /// Holds covering the reference day.
    pub active_holds: u64,
}
