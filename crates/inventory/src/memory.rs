use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{DateRange, RoomId};
use tokio::sync::{Mutex, RwLock};

use crate::{
    HoldOutcome, InventoryError, NewHold, NewRoom, Rejection, Result, Room, RoomHold,
    store::InventoryStore,
};

#[derive(Default)]
struct InventoryState {
    rooms: BTreeMap<RoomId, Room>,
    /// Keyed by request id.
    holds: HashMap<String, RoomHold>,
    next_room_id: i64,
    next_hold_id: i64,
}

/// In-memory room store and hold ledger.
///
/// Hold placement takes a per-room async mutex for the whole
/// check-then-insert sequence, so different rooms proceed independently.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<InventoryState>>,
    room_locks: Arc<Mutex<HashMap<RoomId, Arc<Mutex<()>>>>>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of holds in the ledger.
    pub async fn hold_count(&self) -> usize {
        self.state.read().await.holds.len()
    }

    /// Returns all holds placed on a room.
    pub async fn holds_for_room(&self, room_id: RoomId) -> Vec<RoomHold> {
        let state = self.state.read().await;
        let mut holds: Vec<_> = state
            .holds
            .values()
            .filter(|h| h.room_id == room_id)
            .cloned()
            .collect();
        holds.sort_by_key(|h| h.id);
        holds
    }

    async fn room_lock(&self, room_id: RoomId) -> Arc<Mutex<()>> {
        let mut locks = self.room_locks.lock().await;
        locks.entry(room_id).or_default().clone()
    }
}

fn overlapping_hold<'a>(
    state: &'a InventoryState,
    room_id: RoomId,
    range: &DateRange,
) -> Option<&'a RoomHold> {
    state
        .holds
        .values()
        .find(|h| h.room_id == room_id && h.range.overlaps(range))
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn add_room(&self, room: NewRoom) -> Result<Room> {
        let mut state = self.state.write().await;
        state.next_room_id += 1;
        let room = Room {
            id: RoomId::new(state.next_room_id),
            hotel_id: room.hotel_id,
            number: room.number,
            available: room.available,
            times_booked: room.times_booked,
        };
        state.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        Ok(self.state.read().await.rooms.get(&room_id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        Ok(self.state.read().await.rooms.values().cloned().collect())
    }

    async fn rooms_free_for(&self, range: DateRange) -> Result<Vec<Room>> {
        let state = self.state.read().await;
        Ok(state
            .rooms
            .values()
            .filter(|room| overlapping_hold(&state, room.id, &range).is_none())
            .cloned()
            .collect())
    }

    async fn find_hold(&self, request_id: &str) -> Result<Option<RoomHold>> {
        Ok(self.state.read().await.holds.get(request_id).cloned())
    }

    async fn holds_covering(&self, day: NaiveDate) -> Result<Vec<RoomHold>> {
        let state = self.state.read().await;
        Ok(state
            .holds
            .values()
            .filter(|h| h.range.contains(day))
            .cloned()
            .collect())
    }

    async fn place_hold(&self, hold: NewHold) -> Result<HoldOutcome> {
        let lock = self.room_lock(hold.room_id).await;
        let _room_guard = lock.lock().await;

        {
            let state = self.state.read().await;
            let room = state
                .rooms
                .get(&hold.room_id)
                .ok_or(InventoryError::RoomNotFound(hold.room_id))?;

            if let Some(existing) = state.holds.get(&hold.request_id) {
                return Ok(HoldOutcome::Replayed(existing.clone()));
            }
            if !room.available {
                return Ok(HoldOutcome::Rejected(Rejection::RoomDisabled));
            }
            if let Some(conflict) = overlapping_hold(&state, hold.room_id, &hold.range) {
                return Ok(HoldOutcome::Rejected(Rejection::Overlapping {
                    request_id: conflict.request_id.clone(),
                }));
            }
        }

        // Only removals can touch this room's holds while we hold the room
        // lock, but the same key may have been placed on another room.
        let mut state = self.state.write().await;
        if let Some(existing) = state.holds.get(&hold.request_id) {
            return Ok(HoldOutcome::Replayed(existing.clone()));
        }

        state.next_hold_id += 1;
        let placed = RoomHold {
            id: state.next_hold_id,
            room_id: hold.room_id,
            range: hold.range,
            request_id: hold.request_id,
            booking_id: hold.booking_id,
        };
        state
            .holds
            .insert(placed.request_id.clone(), placed.clone());
        if let Some(room) = state.rooms.get_mut(&placed.room_id) {
            room.times_booked += 1;
        }

        Ok(HoldOutcome::Placed(placed))
    }

    async fn remove_hold(&self, request_id: &str) -> Result<Option<RoomHold>> {
        let mut state = self.state.write().await;
        let Some(hold) = state.holds.remove(request_id) else {
            return Ok(None);
        };
        if let Some(room) = state.rooms.get_mut(&hold.room_id) {
            room.times_booked = room.times_booked.saturating_sub(1);
        }
        Ok(Some(hold))
    }
}
