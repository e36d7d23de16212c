//! Booking service endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use booking::{Booking, BookingStore};
use chrono::NaiveDate;
use common::dates::option_wire_date;
use common::{BookingId, DateRange, Page, PageRequest, RoomId, UserId};
use saga::{BookingOrchestrator, CreateBooking, HotelClient};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::CallerId;

pub type DynBookingStore = Arc<dyn BookingStore>;
pub type DynHotelClient = Arc<dyn HotelClient>;

/// Shared state of the booking service.
pub struct BookingState {
    pub orchestrator: BookingOrchestrator<DynBookingStore, DynHotelClient>,
}

impl BookingState {
    pub fn new(orchestrator: BookingOrchestrator<DynBookingStore, DynHotelClient>) -> Self {
        Self { orchestrator }
    }

    /// Loads a booking owned by `user_id`. Bookings of other users are
    /// reported as missing.
    async fn owned_booking(&self, user_id: UserId, id: BookingId) -> Result<Booking, ApiError> {
        self.orchestrator
            .bookings()
            .get(id)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))
    }
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub room_id: Option<RoomId>,
    #[serde(default, with = "option_wire_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "option_wire_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub auto_select: bool,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl CreateBookingRequest {
    fn into_command(self, user_id: UserId) -> Result<CreateBooking, ApiError> {
        let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
            return Err(ApiError::BadRequest(
                "startDate and endDate are required".to_string(),
            ));
        };
        let range = DateRange::new(start, end)?;
        let request_id = self
            .request_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("requestId is required".to_string()))?;

        Ok(CreateBooking {
            user_id,
            room_id: self.room_id,
            range,
            auto_select: self.auto_select,
            request_id,
        })
    }
}

// -- Handlers --

/// POST /api/booking — runs the booking saga for the caller.
///
/// The saga runs on its own task so a client disconnect cannot abandon it
/// between the hold and the status update.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<Arc<BookingState>>,
    CallerId(user_id): CallerId,
    body: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<Json<Booking>, ApiError> {
    let Json(req) = body?;
    let cmd = req.into_command(user_id)?;

    let task_state = Arc::clone(&state);
    let handle =
        tokio::spawn(async move { task_state.orchestrator.create_booking(cmd).await });
    let booking = handle
        .await
        .map_err(|e| ApiError::Internal(format!("booking saga task failed: {e}")))??;

    Ok(Json(booking))
}

/// GET /api/bookings — the caller's bookings, newest id last.
#[tracing::instrument(skip(state, page))]
pub async fn list(
    State(state): State<Arc<BookingState>>,
    CallerId(user_id): CallerId,
    page: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<Booking>>, ApiError> {
    let Query(page) = page?;
    let page = PageRequest::new(page.page, page.size);

    let bookings = state
        .orchestrator
        .bookings()
        .list_for_user(user_id, page)
        .await?;
    Ok(Json(bookings))
}

/// GET /api/booking/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<BookingState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<BookingId>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.owned_booking(user_id, id).await?))
}

/// DELETE /api/booking/{id} — cancels the booking and releases its hold,
/// whatever its current status.
///
/// Like `create`, the cancellation runs on its own task so the release is not
/// dropped when the client disconnects after the status update.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<BookingState>>,
    CallerId(user_id): CallerId,
    Path(id): Path<BookingId>,
) -> Result<StatusCode, ApiError> {
    let booking = state.owned_booking(user_id, id).await?;
    let correlation_id = booking
        .hold_request_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let task_state = Arc::clone(&state);
    let handle = tokio::spawn(async move {
        task_state
            .orchestrator
            .cancel_and_compensate(id, &correlation_id)
            .await
    });
    handle
        .await
        .map_err(|e| ApiError::Internal(format!("cancellation task failed: {e}")))??;
    Ok(StatusCode::NO_CONTENT)
}
