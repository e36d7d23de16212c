//! Hotel service endpoints: room listings, recommendations, statistics and
//! the hold RPCs called by the booking service.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{AvailabilityRequest, DateRange, HotelId, ReleaseParams, RoomDto, RoomId, parse_wire_date};
use inventory::{AvailabilityEngine, InventoryStore, RoomQuery, RoomSort, RoomStats, SortDirection};
use serde::Deserialize;

use crate::error::ApiError;

/// Inventory store shared by the hotel service handlers.
pub type DynInventoryStore = Arc<dyn InventoryStore>;

/// Shared state of the hotel service.
pub struct HotelState {
    pub engine: AvailabilityEngine<DynInventoryStore>,
}

impl HotelState {
    pub fn new(store: DynInventoryStore) -> Self {
        Self {
            engine: AvailabilityEngine::new(store),
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct StayQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub hotel_id: Option<i64>,
    pub available: Option<bool>,
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

/// Parses the `start` / `end` query parameters into a stay.
pub fn parse_stay(start: Option<&str>, end: Option<&str>) -> Result<DateRange, ApiError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Err(ApiError::BadRequest(
            "Query parameters 'start' and 'end' are required".to_string(),
        ));
    };
    Ok(DateRange::new(parse_wire_date(start)?, parse_wire_date(end)?)?)
}

// -- Handlers --

/// GET /api/rooms — rooms free for a stay, filtered and sorted.
#[tracing::instrument(skip(state, query))]
pub async fn list(
    State(state): State<Arc<HotelState>>,
    query: Result<Query<RoomListQuery>, QueryRejection>,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let Query(query) = query?;
    let range = parse_stay(query.start.as_deref(), query.end.as_deref())?;

    let sort: RoomSort = query.sort_by.as_deref().unwrap_or("id").parse().unwrap_or_default();
    let direction: SortDirection = query
        .direction
        .as_deref()
        .unwrap_or("asc")
        .parse()
        .unwrap_or_default();
    let mut room_query = RoomQuery::for_stay(range).sort_by(sort, direction);
    if let Some(hotel_id) = query.hotel_id {
        room_query = room_query.hotel(HotelId::new(hotel_id));
    }
    if let Some(available) = query.available {
        room_query = room_query.available(available);
    }

    let rooms = state.engine.list_available_rooms(&room_query).await?;
    Ok(Json(rooms.into_iter().map(RoomDto::from).collect()))
}

/// GET /api/rooms/recommend and /api/rooms/internal/recommend — free rooms,
/// least booked first.
#[tracing::instrument(skip(state, query))]
pub async fn recommend(
    State(state): State<Arc<HotelState>>,
    query: Result<Query<StayQuery>, QueryRejection>,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let Query(query) = query?;
    let range = parse_stay(query.start.as_deref(), query.end.as_deref())?;

    let rooms = state.engine.list_recommended_rooms(range).await?;
    Ok(Json(rooms.into_iter().map(RoomDto::from).collect()))
}

/// GET /api/rooms/stats — per-room load, counting holds active today.
pub async fn stats(State(state): State<Arc<HotelState>>) -> Result<Json<Vec<RoomStats>>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    Ok(Json(state.engine.room_stats(today).await?))
}

/// POST /api/rooms/{id}/confirm-availability — places a hold; 409 when the
/// room is disabled or taken.
#[tracing::instrument(skip(state, body))]
pub async fn confirm_availability(
    State(state): State<Arc<HotelState>>,
    Path(room_id): Path<RoomId>,
    body: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = body?;
    let range = DateRange::new(req.start_date, req.end_date)?;

    let held = state
        .engine
        .confirm_availability(room_id, range, &req.request_id, &req.booking_id)
        .await?;
    if held {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::Conflict(format!(
            "Room {room_id} is not available for {range}"
        )))
    }
}

/// POST /internal/rooms/{id}/release?requestId= — idempotent hold release.
#[tracing::instrument(skip(state, params))]
pub async fn release(
    State(state): State<Arc<HotelState>>,
    Path(room_id): Path<RoomId>,
    params: Result<Query<ReleaseParams>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(params) = params?;
    state.engine.release_hold(room_id, &params.request_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
