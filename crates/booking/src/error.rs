use common::{BookingId, DateError, UserId};
use thiserror::Error;

use crate::BookingStatus;
use crate::status::UnknownStatus;

/// Errors that can occur in the booking store or on booking transitions.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Invalid dates: {0}")]
    InvalidDates(#[from] DateError),

    #[error("Request id must not be blank")]
    MissingRequestId,

    #[error("Request id longer than {max} characters")]
    RequestIdTooLong { max: usize },

    /// The requested status change is not one of the permitted transitions.
    #[error("Booking {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    },

    /// The stored status no longer matched the expected one on write.
    #[error("Booking {id} was modified concurrently (expected {expected})")]
    ConcurrentModification {
        id: BookingId,
        expected: BookingStatus,
    },

    #[error("Corrupt booking row: {0}")]
    CorruptStatus(#[from] UnknownStatus),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for booking operations.
pub type Result<T> = std::result::Result<T, BookingError>;
