use common::HotelId;

use crate::{NewRoom, Result, Room, store::InventoryStore};

/// Hotel ids used by the demo data set.
pub const AURORA_HOTEL: HotelId = HotelId::new(1);
pub const VOSTOK_HOTEL: HotelId = HotelId::new(2);

/// Loads the demo rooms into an empty store.
///
/// Does nothing when the store already has rooms.
pub async fn seed_demo_rooms<S: InventoryStore + ?Sized>(store: &S) -> Result<Vec<Room>> {
    if !store.list_rooms().await?.is_empty() {
        return Ok(Vec::new());
    }

    let mut rooms = Vec::with_capacity(4);
    for (hotel_id, number) in [
        (AURORA_HOTEL, "101"),
        (AURORA_HOTEL, "102"),
        (VOSTOK_HOTEL, "201"),
        (VOSTOK_HOTEL, "202"),
    ] {
        rooms.push(store.add_room(NewRoom::new(hotel_id, number)).await?);
    }
    tracing::info!(count = rooms.len(), "seeded demo rooms");
    Ok(rooms)
}
