//! Saga error types.

use booking::BookingError;
use common::{BookingId, RoomId};
use thiserror::Error;

/// Errors returned by hotel service calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotelClientError {
    /// The room is disabled or already held for part of the stay.
    #[error("Room {0} is not available for the requested dates")]
    Conflict(RoomId),

    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    /// The hotel service rejected the request as malformed.
    #[error("Hotel service rejected the request: {0}")]
    BadRequest(String),

    #[error("Hotel service call timed out")]
    Timeout,

    /// The circuit breaker is open; no call was made.
    #[error("Hotel service circuit breaker is open")]
    CircuitOpen,

    /// The hotel service failed while handling the call.
    #[error("Hotel service failed: {0}")]
    Server(String),

    /// The hotel service answered with a status this client does not expect.
    #[error("Hotel service returned unexpected status {0}")]
    UnexpectedStatus(u16),

    /// The call never reached the hotel service.
    #[error("Hotel service unreachable: {0}")]
    Transport(String),
}

impl HotelClientError {
    /// Returns true for failures that say nothing about the request itself and
    /// may succeed on another attempt. Only these count towards the breaker.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HotelClientError::Timeout | HotelClientError::Server(_) | HotelClientError::Transport(_)
        )
    }
}

/// Errors that can occur while running the booking saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// Neither a room id nor auto-select was given.
    #[error("roomId is required when autoSelect is false")]
    RoomRequired,

    /// Auto-select found no free room.
    #[error("No rooms available for the requested dates")]
    NoRoomsAvailable,

    /// The idempotency key already belongs to another user's booking.
    #[error("requestId {0} is already used by another user")]
    RequestIdTaken(String),

    /// The hold could not be confirmed and the booking was cancelled.
    #[error("Booking {booking_id} was cancelled: {reason}")]
    Compensated {
        booking_id: BookingId,
        reason: String,
    },

    /// Booking store or booking transition error.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// Hotel service call error.
    #[error(transparent)]
    Hotel(#[from] HotelClientError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
