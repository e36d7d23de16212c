//! Hotel service client trait and local implementations.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::{AvailabilityRequest, DateRange, RoomDto, RoomId};
use inventory::{AvailabilityEngine, InventoryError, InventoryStore};

use crate::error::HotelClientError;

/// The three calls the booking side makes to the hotel side.
#[async_trait]
pub trait HotelClient: Send + Sync {
    /// Rooms free for the stay, least loaded first.
    async fn recommend(&self, range: DateRange) -> Result<Vec<RoomDto>, HotelClientError>;

    /// Places a hold. A room that is taken or disabled yields `Conflict`.
    async fn confirm_availability(
        &self,
        room_id: RoomId,
        request: &AvailabilityRequest,
    ) -> Result<(), HotelClientError>;

    /// Releases the hold placed under `request_id`; a missing hold is not an
    /// error.
    async fn release(&self, room_id: RoomId, request_id: &str) -> Result<(), HotelClientError>;
}

#[async_trait]
impl<T: HotelClient + ?Sized> HotelClient for Arc<T> {
    async fn recommend(&self, range: DateRange) -> Result<Vec<RoomDto>, HotelClientError> {
        (**self).recommend(range).await
    }

    async fn confirm_availability(
        &self,
        room_id: RoomId,
        request: &AvailabilityRequest,
    ) -> Result<(), HotelClientError> {
        (**self).confirm_availability(room_id, request).await
    }

    async fn release(&self, room_id: RoomId, request_id: &str) -> Result<(), HotelClientError> {
        (**self).release(room_id, request_id).await
    }
}

fn engine_error(room_id: RoomId, e: InventoryError) -> HotelClientError {
    match e {
        InventoryError::RoomNotFound(_) => HotelClientError::RoomNotFound(room_id),
        InventoryError::InvalidDates(e) => HotelClientError::BadRequest(e.to_string()),
        other @ (InventoryError::MissingRequestId | InventoryError::KeyTooLong { .. }) => {
            HotelClientError::BadRequest(other.to_string())
        }
        other => HotelClientError::Server(other.to_string()),
    }
}

/// Calls an availability engine living in the same process.
pub struct EngineHotelClient<S: InventoryStore> {
    engine: Arc<AvailabilityEngine<S>>,
}

impl<S: InventoryStore> EngineHotelClient<S> {
    pub fn new(engine: Arc<AvailabilityEngine<S>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &AvailabilityEngine<S> {
        &self.engine
    }
}

#[async_trait]
impl<S: InventoryStore> HotelClient for EngineHotelClient<S> {
    async fn recommend(&self, range: DateRange) -> Result<Vec<RoomDto>, HotelClientError> {
        let rooms = self
            .engine
            .list_recommended_rooms(range)
            .await
            .map_err(|e| HotelClientError::Server(e.to_string()))?;
        Ok(rooms.into_iter().map(RoomDto::from).collect())
    }

    async fn confirm_availability(
        &self,
        room_id: RoomId,
        request: &AvailabilityRequest,
    ) -> Result<(), HotelClientError> {
        let range = DateRange::new(request.start_date, request.end_date)
            .map_err(|e| HotelClientError::BadRequest(e.to_string()))?;
        let held = self
            .engine
            .confirm_availability(room_id, range, &request.request_id, &request.booking_id)
            .await
            .map_err(|e| engine_error(room_id, e))?;
        if held {
            Ok(())
        } else {
            Err(HotelClientError::Conflict(room_id))
        }
    }

    async fn release(&self, room_id: RoomId, request_id: &str) -> Result<(), HotelClientError> {
        self.engine
            .release_hold(room_id, request_id)
            .await
            .map(|_| ())
            .map_err(|e| engine_error(room_id, e))
    }
}

#[derive(Debug, Default)]
struct ScriptedHotelState {
    recommended: Vec<RoomDto>,
    /// request id -> room
    holds: HashMap<String, RoomId>,
    conflict_rooms: HashSet<RoomId>,
    transient_confirm_failures: u32,
    fail_confirm: bool,
    fail_release: bool,
    fail_recommend: bool,
    confirm_delay: Option<Duration>,
    confirm_calls: u32,
    confirm_request_ids: Vec<String>,
    release_request_ids: Vec<String>,
}

/// Scripted hotel client for tests.
///
/// Holds are tracked by request id only; there is no overlap logic.
/// Conflicts and failures are switched on per test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHotelClient {
    state: Arc<Mutex<ScriptedHotelState>>,
}

impl InMemoryHotelClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptedHotelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the rooms returned by `recommend`, in order.
    pub fn set_recommended(&self, rooms: Vec<RoomDto>) {
        self.state().recommended = rooms;
    }

    /// Makes every confirm for this room answer `Conflict`.
    pub fn set_conflict(&self, room_id: RoomId) {
        self.state().conflict_rooms.insert(room_id);
    }

    /// Makes the next `count` confirms fail with a transient server error.
    pub fn set_transient_confirm_failures(&self, count: u32) {
        self.state().transient_confirm_failures = count;
    }

    /// Makes every confirm fail with a transient server error.
    pub fn set_fail_on_confirm(&self, fail: bool) {
        self.state().fail_confirm = fail;
    }

    pub fn set_fail_on_release(&self, fail: bool) {
        self.state().fail_release = fail;
    }

    pub fn set_fail_on_recommend(&self, fail: bool) {
        self.state().fail_recommend = fail;
    }

    /// Delays every confirm before it answers.
    pub fn set_confirm_delay(&self, delay: Duration) {
        self.state().confirm_delay = Some(delay);
    }

    /// Number of confirm calls received, including failed ones.
    pub fn confirm_calls(&self) -> u32 {
        self.state().confirm_calls
    }

    /// Request ids of all confirm calls, in order.
    pub fn confirm_request_ids(&self) -> Vec<String> {
        self.state().confirm_request_ids.clone()
    }

    /// Request ids of all release calls, in order.
    pub fn released_request_ids(&self) -> Vec<String> {
        self.state().release_request_ids.clone()
    }

    pub fn hold_count(&self) -> usize {
        self.state().holds.len()
    }

    pub fn has_hold(&self, request_id: &str) -> bool {
        self.state().holds.contains_key(request_id)
    }
}

#[async_trait]
impl HotelClient for InMemoryHotelClient {
    async fn recommend(&self, _range: DateRange) -> Result<Vec<RoomDto>, HotelClientError> {
        let state = self.state();
        if state.fail_recommend {
            return Err(HotelClientError::Server("scripted recommend failure".to_string()));
        }
        Ok(state.recommended.clone())
    }

    async fn confirm_availability(
        &self,
        room_id: RoomId,
        request: &AvailabilityRequest,
    ) -> Result<(), HotelClientError> {
        let delay = {
            let mut state = self.state();
            state.confirm_calls += 1;
            state.confirm_request_ids.push(request.request_id.clone());
            state.confirm_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.transient_confirm_failures > 0 {
            state.transient_confirm_failures -= 1;
            return Err(HotelClientError::Server("scripted confirm failure".to_string()));
        }
        if state.fail_confirm {
            return Err(HotelClientError::Server("scripted confirm failure".to_string()));
        }
        if state.conflict_rooms.contains(&room_id) {
            return Err(HotelClientError::Conflict(room_id));
        }
        state.holds.insert(request.request_id.clone(), room_id);
        Ok(())
    }

    async fn release(&self, _room_id: RoomId, request_id: &str) -> Result<(), HotelClientError> {
        let mut state = self.state();
        state.release_request_ids.push(request_id.to_string());
        if state.fail_release {
            return Err(HotelClientError::Server("scripted release failure".to_string()));
        }
        state.holds.remove(request_id);
        Ok(())
    }
}
