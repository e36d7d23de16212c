//! Hotel-side inventory: the room store, the hold ledger and the
//! availability engine that serializes holds per room.

pub mod engine;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod room;
pub mod seed;
pub mod store;

pub use engine::{AvailabilityEngine, MAX_HOLD_KEY_LEN};
pub use error::{InventoryError, Result};
pub use memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use query::{RoomQuery, RoomSort, SortDirection};
pub use room::{HoldOutcome, NewHold, NewRoom, Rejection, Room, RoomHold, RoomStats};
pub use seed::seed_demo_rooms;
pub use store::InventoryStore;
