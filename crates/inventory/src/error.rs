use common::{DateError, RoomId};
use thiserror::Error;

/// Errors that can occur in the room store, hold ledger or availability engine.
///
/// An availability conflict is not an error: it is reported as a rejected
/// hold (`false` from `confirm_availability`).
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The referenced room does not exist.
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// A date range was malformed.
    #[error("Invalid dates: {0}")]
    InvalidDates(#[from] DateError),

    /// The idempotency key of a hold was blank.
    #[error("Request id must not be blank")]
    MissingRequestId,

    /// A hold key exceeded the ledger's column width.
    #[error("{field} longer than {max} characters")]
    KeyTooLong { field: &'static str, max: usize },

    /// A hold with this request id was inserted and removed while we raced it.
    #[error("Hold for request '{0}' changed concurrently")]
    ConcurrentHold(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
