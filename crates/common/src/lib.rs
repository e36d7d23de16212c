//! Types shared by the hotel (inventory) service and the booking service.

pub mod dates;
pub mod page;
pub mod rpc;
mod types;

pub use dates::{DateError, DateRange, parse_wire_date};
pub use page::{Page, PageRequest};
pub use rpc::{AvailabilityRequest, ReleaseParams, RoomDto, StayParams};
pub use types::{BookingId, HotelId, RoomId, UserId};
