//! Clients for the services the booking saga calls.

pub mod hotel;

pub use hotel::{EngineHotelClient, HotelClient, InMemoryHotelClient};
