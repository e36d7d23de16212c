//! Availability engine: hold placement, release, listing and recommendation.

use std::collections::HashMap;

use chrono::NaiveDate;
use common::{DateRange, RoomId};

use crate::{
    HoldOutcome, InventoryError, NewHold, Result, Room, RoomQuery, RoomStats,
    store::InventoryStore,
};

/// Longest accepted hold request id or booking id.
pub const MAX_HOLD_KEY_LEN: usize = 64;

/// Decides which rooms are free and records holds on them.
///
/// All mutual exclusion lives in the store's `place_hold`; the engine adds the
/// idempotency fast path, validation, logging and metrics.
pub struct AvailabilityEngine<S: InventoryStore> {
    store: S,
}

impl<S: InventoryStore> AvailabilityEngine<S> {
    /// Creates a new engine over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places a hold on a room for a stay.
    ///
    /// Returns `true` if the room is held for `request_id` afterwards (newly
    /// or by an earlier call with the same key) and `false` if the room is
    /// disabled or taken for part of the stay. A `false` result mutates
    /// nothing.
    #[tracing::instrument(skip(self, range), fields(start = %range.start(), end = %range.end()))]
    pub async fn confirm_availability(
        &self,
        room_id: RoomId,
        range: DateRange,
        request_id: &str,
        booking_id: &str,
    ) -> Result<bool> {
        if request_id.trim().is_empty() {
            return Err(InventoryError::MissingRequestId);
        }
        for (field, value) in [("requestId", request_id), ("bookingId", booking_id)] {
            if value.chars().count() > MAX_HOLD_KEY_LEN {
                return Err(InventoryError::KeyTooLong {
                    field,
                    max: MAX_HOLD_KEY_LEN,
                });
            }
        }

        if let Some(existing) = self.store.find_hold(request_id).await? {
            tracing::info!(hold_room_id = %existing.room_id, "hold already recorded for request");
            metrics::counter!("hold_confirmations_total", "outcome" => "replayed").increment(1);
            return Ok(true);
        }

        let outcome = self
            .store
            .place_hold(NewHold {
                room_id,
                range,
                request_id: request_id.to_string(),
                booking_id: booking_id.to_string(),
            })
            .await?;

        match &outcome {
            HoldOutcome::Placed(hold) => {
                tracing::info!(hold_id = hold.id, "hold placed");
                metrics::counter!("hold_confirmations_total", "outcome" => "placed").increment(1);
            }
            HoldOutcome::Replayed(_) => {
                tracing::info!("hold recorded concurrently for request");
                metrics::counter!("hold_confirmations_total", "outcome" => "replayed")
                    .increment(1);
            }
            HoldOutcome::Rejected(reason) => {
                tracing::warn!(%reason, "room not available for stay");
                metrics::counter!("hold_confirmations_total", "outcome" => "rejected")
                    .increment(1);
            }
        }

        Ok(outcome.is_held())
    }

    /// Releases the hold recorded for `request_id`, if any.
    ///
    /// The hold's own room has its load counter decremented; `room_id` is only
    /// used for logging. Returns whether a hold was removed.
    #[tracing::instrument(skip(self))]
    pub async fn release_hold(&self, room_id: RoomId, request_id: &str) -> Result<bool> {
        let Some(hold) = self.store.remove_hold(request_id).await? else {
            tracing::debug!("no hold recorded for request, nothing to release");
            return Ok(false);
        };

        if hold.room_id != room_id {
            tracing::warn!(hold_room_id = %hold.room_id, "release named a different room than the hold");
        }
        tracing::info!(hold_id = hold.id, "hold released");
        metrics::counter!("hold_releases_total").increment(1);
        Ok(true)
    }

    /// Lists rooms free for the query's stay, filtered and sorted as requested.
    pub async fn list_available_rooms(&self, query: &RoomQuery) -> Result<Vec<Room>> {
        let mut rooms = self.store.rooms_free_for(query.range).await?;
        query.apply(&mut rooms);
        Ok(rooms)
    }

    /// Lists available rooms free for `range`, least loaded first, ties by id.
    #[tracing::instrument(skip(self))]
    pub async fn list_recommended_rooms(&self, range: DateRange) -> Result<Vec<Room>> {
        let mut rooms = self.store.rooms_free_for(range).await?;
        rooms.retain(|room| room.available);
        rooms.sort_by_key(|room| (room.times_booked, room.id));
        tracing::debug!(candidates = rooms.len(), "recommended rooms");
        Ok(rooms)
    }

    /// Per-room load statistics, counting holds that cover `today`.
    pub async fn room_stats(&self, today: NaiveDate) -> Result<Vec<RoomStats>> {
        let mut active: HashMap<RoomId, u64> = HashMap::new();
        for hold in self.store.holds_covering(today).await? {
            *active.entry(hold.room_id).or_default() += 1;
        }

        Ok(self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .map(|room| RoomStats {
                active_holds: active.get(&room.id).copied().unwrap_or(0),
                room_id: room.id,
                room_number: room.number,
                hotel_id: room.hotel_id,
                times_booked: room.times_booked,
            })
            .collect())
    }
}
