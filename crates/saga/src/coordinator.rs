//! Booking orchestrator: drives a booking from PENDING to CONFIRMED, or
//! compensates to CANCELLED.

use std::time::Instant;

use booking::{Booking, BookingError, BookingStatus, BookingStore, NewBooking};
use common::{AvailabilityRequest, BookingId, DateRange, RoomId, UserId};
use uuid::Uuid;

use crate::error::{Result, SagaError};
use crate::resilience::HotelCallPolicy;
use crate::services::hotel::HotelClient;
use crate::state::SagaOutcome;

/// Input of the create-booking saga.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: UserId,
    /// Required unless `auto_select` is set; ignored when it is.
    pub room_id: Option<RoomId>,
    pub range: DateRange,
    pub auto_select: bool,
    /// Client idempotency key.
    pub request_id: String,
}

/// Orchestrates the try / confirm / cancel booking saga against the hotel
/// service.
///
/// Every hotel call goes through the [`HotelCallPolicy`]. The confirm step
/// never compensates by itself; the create saga and explicit cancellation do.
pub struct BookingOrchestrator<B, H>
where
    B: BookingStore,
    H: HotelClient,
{
    bookings: B,
    hotel: H,
    policy: HotelCallPolicy,
}

impl<B, H> BookingOrchestrator<B, H>
where
    B: BookingStore,
    H: HotelClient,
{
    /// Creates a new orchestrator.
    pub fn new(bookings: B, hotel: H, policy: HotelCallPolicy) -> Self {
        Self {
            bookings,
            hotel,
            policy,
        }
    }

    pub fn bookings(&self) -> &B {
        &self.bookings
    }

    pub fn hotel(&self) -> &H {
        &self.hotel
    }

    pub fn policy(&self) -> &HotelCallPolicy {
        &self.policy
    }

    /// Creates a PENDING booking, or returns the booking already recorded
    /// for `request_id` without side effects.
    #[tracing::instrument(skip(self, range), fields(start = %range.start(), end = %range.end()))]
    pub async fn create_pending(
        &self,
        user_id: UserId,
        room_id: RoomId,
        range: DateRange,
        request_id: &str,
    ) -> Result<Booking> {
        let new_booking = NewBooking::new(user_id, room_id, range, request_id)?;

        if let Some(existing) = self.bookings.find_by_request_id(request_id).await? {
            tracing::info!(booking_id = %existing.id, status = %existing.status, "request already recorded");
            return owned_by(existing, user_id);
        }

        if self.bookings.find_user(user_id).await?.is_none() {
            return Err(BookingError::UserNotFound(user_id).into());
        }

        let booking = self.bookings.insert_pending(new_booking).await?;
        tracing::info!(booking_id = %booking.id, "pending booking created");
        Ok(booking)
    }

    /// Asks the hotel service to hold the room and marks the booking
    /// CONFIRMED.
    ///
    /// A confirmed booking is returned unchanged; a cancelled one is rejected
    /// before any call is made. The hold correlation id is recorded on the
    /// booking before the call, and reused by later attempts.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, booking_id: BookingId) -> Result<Booking> {
        let booking = self.load(booking_id).await?;
        match booking.status {
            BookingStatus::Confirmed => return Ok(booking),
            BookingStatus::Cancelled => {
                return Err(BookingError::InvalidTransition {
                    id: booking.id,
                    from: booking.status,
                    to: BookingStatus::Confirmed,
                }
                .into());
            }
            BookingStatus::Pending => {}
        }

        let candidate = booking
            .hold_request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut booking = self.bookings.record_hold_request(booking.id, &candidate).await?;
        let correlation_id = booking.hold_request_id.clone().unwrap_or(candidate);

        let request = AvailabilityRequest {
            start_date: booking.start_date,
            end_date: booking.end_date,
            request_id: correlation_id.clone(),
            booking_id: booking.id.to_string(),
        };
        let room_id = booking.room_id;
        self.policy
            .execute("confirm_availability", || {
                self.hotel.confirm_availability(room_id, &request)
            })
            .await?;

        booking.confirm()?;
        match self.bookings.update_status(&booking, BookingStatus::Pending).await {
            Ok(()) => {}
            Err(BookingError::ConcurrentModification { .. }) => {
                // Another attempt got there first; report what is stored
                let stored = self.load(booking_id).await?;
                if stored.status == BookingStatus::Cancelled {
                    // The cancel's release may have reached the hotel before
                    // this hold did
                    self.release_hold(room_id, &correlation_id).await;
                }
                if stored.status != BookingStatus::Confirmed {
                    return Err(BookingError::InvalidTransition {
                        id: stored.id,
                        from: stored.status,
                        to: BookingStatus::Confirmed,
                    }
                    .into());
                }
                return Ok(stored);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(%correlation_id, "booking confirmed");
        Ok(booking)
    }

    /// Cancels the booking, then releases the hold placed under
    /// `correlation_id`.
    ///
    /// A cancelled booking is returned unchanged. A failed release is logged
    /// and counted; the booking stays cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_and_compensate(
        &self,
        booking_id: BookingId,
        correlation_id: &str,
    ) -> Result<Booking> {
        let mut booking = self.load(booking_id).await?;

        loop {
            if booking.status == BookingStatus::Cancelled {
                tracing::debug!("booking already cancelled");
                return Ok(booking);
            }
            let previous = booking.status;
            if previous == BookingStatus::Confirmed {
                tracing::info!("cancelling a confirmed booking");
            }
            booking.cancel()?;
            match self.bookings.update_status(&booking, previous).await {
                Ok(()) => break,
                // Status moved under us (e.g. a confirm landed); re-read and retry
                Err(BookingError::ConcurrentModification { .. }) => {
                    booking = self.load(booking_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!("booking cancelled");

        self.release_hold(booking.room_id, correlation_id).await;
        Ok(booking)
    }

    /// Releases a hold. A failed release is logged and counted, never
    /// returned.
    async fn release_hold(&self, room_id: RoomId, correlation_id: &str) {
        match self
            .policy
            .execute("release", || self.hotel.release(room_id, correlation_id))
            .await
        {
            Ok(()) => tracing::info!(%room_id, %correlation_id, "hold released"),
            Err(e) => {
                metrics::counter!("booking_compensation_release_failures_total").increment(1);
                tracing::warn!(%room_id, %correlation_id, error = %e, "hold release failed, hold may remain");
            }
        }
    }

    /// Runs the whole create saga: select a room, create the pending booking,
    /// confirm it, and compensate if confirmation fails.
    ///
    /// Any confirmation failure surfaces as [`SagaError::Compensated`].
    #[tracing::instrument(skip(self, cmd), fields(request_id = %cmd.request_id, user_id = %cmd.user_id))]
    pub async fn create_booking(&self, cmd: CreateBooking) -> Result<Booking> {
        let started = Instant::now();

        let (outcome, result) = self.run_create(cmd).await;

        metrics::counter!("booking_saga_total", "outcome" => outcome.as_str()).increment(1);
        metrics::histogram!("booking_saga_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(booking) => tracing::info!(booking_id = %booking.id, %outcome, "booking saga finished"),
            Err(e) => tracing::warn!(%outcome, error = %e, "booking saga failed"),
        }
        result
    }

    async fn run_create(&self, cmd: CreateBooking) -> (SagaOutcome, Result<Booking>) {
        if cmd.request_id.trim().is_empty() {
            return (
                SagaOutcome::Rejected,
                Err(BookingError::MissingRequestId.into()),
            );
        }

        // A replayed request resumes its own booking instead of picking a room again
        let pending = match self.bookings.find_by_request_id(&cmd.request_id).await {
            Ok(Some(existing)) => match owned_by(existing, cmd.user_id) {
                Ok(existing) => existing,
                Err(e) => return (SagaOutcome::Rejected, Err(e)),
            },
            Ok(None) => {
                let room_id = match self.select_room(&cmd).await {
                    Ok(room_id) => room_id,
                    Err(e @ SagaError::NoRoomsAvailable) => return (SagaOutcome::NoRooms, Err(e)),
                    Err(e) => return (SagaOutcome::Rejected, Err(e)),
                };
                match self
                    .create_pending(cmd.user_id, room_id, cmd.range, &cmd.request_id)
                    .await
                {
                    Ok(booking) => booking,
                    Err(e) => return (SagaOutcome::Rejected, Err(e)),
                }
            }
            Err(e) => return (SagaOutcome::Rejected, Err(e.into())),
        };

        match pending.status {
            BookingStatus::Confirmed => return (SagaOutcome::Replayed, Ok(pending)),
            BookingStatus::Cancelled => {
                return (
                    SagaOutcome::Compensated,
                    Err(SagaError::Compensated {
                        booking_id: pending.id,
                        reason: "booking was already cancelled".to_string(),
                    }),
                );
            }
            BookingStatus::Pending => {}
        }

        match self.confirm(pending.id).await {
            Ok(confirmed) => (SagaOutcome::Confirmed, Ok(confirmed)),
            Err(e) => {
                tracing::warn!(booking_id = %pending.id, error = %e, "confirmation failed, compensating");
                self.compensate(pending.id).await;
                (
                    SagaOutcome::Compensated,
                    Err(SagaError::Compensated {
                        booking_id: pending.id,
                        reason: e.to_string(),
                    }),
                )
            }
        }
    }

    async fn select_room(&self, cmd: &CreateBooking) -> Result<RoomId> {
        if !cmd.auto_select {
            return cmd.room_id.ok_or(SagaError::RoomRequired);
        }

        let range = cmd.range;
        let rooms = self
            .policy
            .execute("recommend", || self.hotel.recommend(range))
            .await?;
        let room = rooms.first().ok_or(SagaError::NoRoomsAvailable)?;
        tracing::info!(room_id = %room.room_id, times_booked = room.times_booked, "auto-selected room");
        Ok(room.room_id)
    }

    /// Cancels with the hold correlation id recorded on the booking. Without
    /// one no hold was requested, and a fresh id makes the release a no-op.
    async fn compensate(&self, booking_id: BookingId) {
        let correlation_id = match self.bookings.get(booking_id).await {
            Ok(Some(booking)) => booking.hold_request_id,
            Ok(None) => None,
            Err(e) => {
                tracing::error!(error = %e, "could not load booking for compensation");
                None
            }
        }
        .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Err(e) = self.cancel_and_compensate(booking_id, &correlation_id).await {
            tracing::error!(%booking_id, error = %e, "compensation failed");
        }
    }

    async fn load(&self, booking_id: BookingId) -> Result<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(booking_id).into())
    }
}

/// A replayed request id only resolves to the caller's own booking.
fn owned_by(existing: Booking, user_id: UserId) -> Result<Booking> {
    if existing.user_id != user_id {
        tracing::warn!(booking_id = %existing.id, %user_id, "requestId replayed by another user");
        return Err(SagaError::RequestIdTaken(existing.request_id));
    }
    Ok(existing)
}
