use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{DateRange, RoomId};

use crate::{HoldOutcome, NewHold, NewRoom, Result, Room, RoomHold};

/// Persistence for rooms and the hold ledger.
///
/// Implementations must serialize hold placement per room: two concurrent
/// `place_hold` calls for the same room never both observe the room as free.
/// Calls for different rooms must not wait on each other.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Registers a room and returns it with its assigned id.
    async fn add_room(&self, room: NewRoom) -> Result<Room>;

    /// Fetches a room by id.
    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>>;

    /// Lists every room, ordered by id.
    async fn list_rooms(&self) -> Result<Vec<Room>>;

    /// Lists rooms with no hold overlapping `range`, ordered by id.
    ///
    /// The administrative flag is not consulted here.
    async fn rooms_free_for(&self, range: DateRange) -> Result<Vec<Room>>;

    /// Looks up a hold by its idempotency key.
    async fn find_hold(&self, request_id: &str) -> Result<Option<RoomHold>>;

    /// Lists holds whose range contains `day`.
    async fn holds_covering(&self, day: NaiveDate) -> Result<Vec<RoomHold>>;

    /// Atomically places a hold under the room lock.
    ///
    /// Re-checks the idempotency key, the administrative flag and overlap
    /// before inserting. On success the room's load counter is incremented in
    /// the same unit of work.
    async fn place_hold(&self, hold: NewHold) -> Result<HoldOutcome>;

    /// Removes the hold with this key and decrements its room's load counter,
    /// floored at zero. Returns the removed hold, or None if there was none.
    async fn remove_hold(&self, request_id: &str) -> Result<Option<RoomHold>>;
}

// Lets services pick the store at runtime behind `Arc<dyn InventoryStore>`.
#[async_trait]
impl<T: InventoryStore + ?Sized> InventoryStore for Arc<T> {
    async fn add_room(&self, room: NewRoom) -> Result<Room> {
        (**self).add_room(room).await
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        (**self).get_room(room_id).await
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        (**self).list_rooms().await
    }

    async fn rooms_free_for(&self, range: DateRange) -> Result<Vec<Room>> {
        (**self).rooms_free_for(range).await
    }

    async fn find_hold(&self, request_id: &str) -> Result<Option<RoomHold>> {
        (**self).find_hold(request_id).await
    }

    async fn holds_covering(&self, day: NaiveDate) -> Result<Vec<RoomHold>> {
        (**self).holds_covering(day).await
    }

    async fn place_hold(&self, hold: NewHold) -> Result<HoldOutcome> {
        (**self).place_hold(hold).await
    }

    async fn remove_hold(&self, request_id: &str) -> Result<Option<RoomHold>> {
        (**self).remove_hold(request_id).await
    }
}
