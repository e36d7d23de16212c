//! Outcomes of the create-booking saga.

use serde::{Deserialize, Serialize};

/// How a run of the create-booking saga ended.
///
/// ```text
/// validate ──► select room ──► create pending ──► confirm ──┬──► Confirmed
///    │              │                                       └──► Compensated
///    └──► Rejected  └──► NoRooms
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SagaOutcome {
    /// The hold was confirmed and the booking is CONFIRMED.
    Confirmed,

    /// The request id matched a booking that was already confirmed.
    Replayed,

    /// Confirmation failed; the booking was cancelled and its hold released.
    Compensated,

    /// Auto-select found no free room; nothing was written.
    NoRooms,

    /// The request was invalid or a store call failed before any hold.
    Rejected,
}

impl SagaOutcome {
    /// Returns true if the caller ends up with a confirmed booking.
    pub fn is_success(&self) -> bool {
        matches!(self, SagaOutcome::Confirmed | SagaOutcome::Replayed)
    }

    /// Returns the outcome name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaOutcome::Confirmed => "confirmed",
            SagaOutcome::Replayed => "replayed",
            SagaOutcome::Compensated => "compensated",
            SagaOutcome::NoRooms => "no_rooms",
            SagaOutcome::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for SagaOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
