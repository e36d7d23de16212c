//! Booking-side persistence: users, bookings and the booking status state
//! machine.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod seed;
pub mod status;
pub mod store;

pub use error::{BookingError, Result};
pub use memory::InMemoryBookingStore;
pub use model::{Booking, MAX_REQUEST_ID_LEN, NewBooking, User};
pub use postgres::PostgresBookingStore;
pub use seed::seed_demo_users;
pub use status::BookingStatus;
pub use store::BookingStore;
