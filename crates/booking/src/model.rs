//! Bookings and their owners.

use chrono::{DateTime, NaiveDate, Utc};
use common::dates::wire_date;
use common::{BookingId, DateRange, RoomId, UserId};
use serde::{Deserialize, Serialize};

use crate::{BookingError, BookingStatus, Result};

/// Longest accepted client idempotency key.
pub const MAX_REQUEST_ID_LEN: usize = 64;

/// A user that can own bookings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// A reservation of a room for a stay, owned by a user.
///
/// Bookings are never deleted; cancellation is a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    #[serde(with = "wire_date")]
    pub start_date: NaiveDate,
    #[serde(with = "wire_date")]
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    /// Client idempotency key.
    pub request_id: String,
    /// Correlation id used for the hotel hold, recorded before the hold is
    /// requested so compensation releases exactly that hold.
    pub hold_request_id: Option<String>,
}

impl Booking {
    /// Moves a pending booking to confirmed.
    pub fn confirm(&mut self) -> Result<()> {
        self.transition(BookingStatus::Confirmed, self.status.can_confirm())
    }

    /// Moves a pending or confirmed booking to cancelled.
    pub fn cancel(&mut self) -> Result<()> {
        self.transition(BookingStatus::Cancelled, self.status.can_cancel())
    }

    fn transition(&mut self, to: BookingStatus, allowed: bool) -> Result<()> {
        if !allowed {
            return Err(BookingError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// Data for a booking about to be created in `Pending` status.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub range: DateRange,
    pub request_id: String,
}

impl NewBooking {
    /// Validates the idempotency key and builds the new booking.
    pub fn new(
        user_id: UserId,
        room_id: RoomId,
        range: DateRange,
        request_id: impl Into<String>,
    ) -> Result<Self> {
        let request_id = request_id.into();
        if request_id.trim().is_empty() {
            return Err(BookingError::MissingRequestId);
        }
        if request_id.chars().count() > MAX_REQUEST_ID_LEN {
            return Err(BookingError::RequestIdTooLong {
                max: MAX_REQUEST_ID_LEN,
            });
        }
        Ok(Self {
            user_id,
            room_id,
            range,
            request_id,
        })
    }
}
