//! Booking saga orchestration.
//!
//! A booking is created PENDING, the hotel service is asked to hold the room
//! for the stay, and the booking is then CONFIRMED. When the hold cannot be
//! placed the booking is CANCELLED and any hold placed under its correlation
//! id is released.
//!
//! Hotel calls go through a [`HotelCallPolicy`]: bounded retries with
//! exponential backoff, a circuit breaker and a per-attempt timeout.

pub mod coordinator;
pub mod error;
pub mod resilience;
pub mod services;
pub mod state;

pub use coordinator::{BookingOrchestrator, CreateBooking};
pub use error::{HotelClientError, Result, SagaError};
pub use resilience::{CircuitBreaker, CircuitState, HotelCallPolicy, RetryPolicy};
pub use services::{EngineHotelClient, HotelClient, InMemoryHotelClient};
pub use state::SagaOutcome;
