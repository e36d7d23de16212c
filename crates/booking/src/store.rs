use std::sync::Arc;

use async_trait::async_trait;
use common::{BookingId, Page, PageRequest, UserId};

use crate::{Booking, BookingStatus, NewBooking, Result, User};

/// Persistence for users and bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Registers a user and returns it with its assigned id.
    async fn insert_user(&self, username: &str) -> Result<User>;

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Creates a pending booking.
    ///
    /// If a booking with the same request id already exists, that booking is
    /// returned and nothing is written, also when two inserts race.
    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking>;

    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Booking>>;

    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Records the hold correlation id unless one is already recorded, and
    /// returns the booking with whichever id is in effect.
    async fn record_hold_request(&self, id: BookingId, hold_request_id: &str) -> Result<Booking>;

    /// Writes `booking.status` if the stored status still equals `expected`.
    ///
    /// Fails with `ConcurrentModification` otherwise.
    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()>;

    /// Lists a user's bookings by ascending id.
    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>>;
}

#[async_trait]
impl<T: BookingStore + ?Sized> BookingStore for Arc<T> {
    async fn insert_user(&self, username: &str) -> Result<User> {
        (**self).insert_user(username).await
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        (**self).find_user(user_id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        (**self).find_user_by_username(username).await
    }

    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking> {
        (**self).insert_pending(booking).await
    }

    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Booking>> {
        (**self).find_by_request_id(request_id).await
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        (**self).get(id).await
    }

    async fn record_hold_request(&self, id: BookingId, hold_request_id: &str) -> Result<Booking> {
        (**self).record_hold_request(id, hold_request_id).await
    }

    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        (**self).update_status(booking, expected).await
    }

    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>> {
        (**self).list_for_user(user_id, page).await
    }
}
