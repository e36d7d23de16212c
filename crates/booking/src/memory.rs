use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BookingId, Page, PageRequest, UserId};
use tokio::sync::RwLock;

use crate::{
    Booking, BookingError, BookingStatus, NewBooking, Result, User, store::BookingStore,
};

#[derive(Default)]
struct BookingState {
    users: BTreeMap<UserId, User>,
    bookings: BTreeMap<BookingId, Booking>,
    by_request: HashMap<String, BookingId>,
    next_user_id: i64,
    next_booking_id: i64,
}

/// In-memory booking store.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<RwLock<BookingState>>,
}

impl InMemoryBookingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of bookings stored.
    pub async fn booking_count(&self) -> usize {
        self.state.read().await.bookings.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert_user(&self, username: &str) -> Result<User> {
        let mut state = self.state.write().await;
        state.next_user_id += 1;
        let user = User {
            id: UserId::new(state.next_user_id),
            username: username.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking> {
        let mut state = self.state.write().await;

        if let Some(existing) = state
            .by_request
            .get(&booking.request_id)
            .and_then(|id| state.bookings.get(id))
        {
            return Ok(existing.clone());
        }

        state.next_booking_id += 1;
        let created = Booking {
            id: BookingId::new(state.next_booking_id),
            user_id: booking.user_id,
            room_id: booking.room_id,
            start_date: booking.range.start(),
            end_date: booking.range.end(),
            status: BookingStatus::Pending,
            created_at: Utc::now(),
            request_id: booking.request_id,
            hold_request_id: None,
        };
        state
            .by_request
            .insert(created.request_id.clone(), created.id);
        state.bookings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Booking>> {
        let state = self.state.read().await;
        Ok(state
            .by_request
            .get(request_id)
            .and_then(|id| state.bookings.get(id))
            .cloned())
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn record_hold_request(&self, id: BookingId, hold_request_id: &str) -> Result<Booking> {
        let mut state = self.state.write().await;
        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::NotFound(id))?;
        if booking.hold_request_id.is_none() {
            booking.hold_request_id = Some(hold_request_id.to_string());
        }
        Ok(booking.clone())
    }

    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .bookings
            .get_mut(&booking.id)
            .ok_or(BookingError::NotFound(booking.id))?;
        if stored.status != expected {
            return Err(BookingError::ConcurrentModification {
                id: booking.id,
                expected,
            });
        }
        stored.status = booking.status;
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>> {
        let state = self.state.read().await;
        let owned: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .collect();
        let total = owned.len() as u64;
        let content = owned
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok(Page::new(content, page, total))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use common::{DateRange, RoomId};

    use super::*;

    fn new_booking(user_id: UserId, request_id: &str) -> NewBooking {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 4).unwrap(),
        )
        .unwrap();
        NewBooking::new(user_id, RoomId::new(1), range, request_id).unwrap()
    }

    #[tokio::test]
    async fn test_insert_pending_is_idempotent() {
        let store = InMemoryBookingStore::new();
        let user = store.insert_user("alice").await.unwrap();

        let first = store.insert_pending(new_booking(user.id, "req-1")).await.unwrap();
        let second = store.insert_pending(new_booking(user.id, "req-1")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.status, BookingStatus::Pending);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_record_hold_request_keeps_first_value() {
        let store = InMemoryBookingStore::new();
        let user = store.insert_user("alice").await.unwrap();
        let booking = store.insert_pending(new_booking(user.id, "req-1")).await.unwrap();

        let first = store.record_hold_request(booking.id, "hold-a").await.unwrap();
        let second = store.record_hold_request(booking.id, "hold-b").await.unwrap();

        assert_eq!(first.hold_request_id.as_deref(), Some("hold-a"));
        assert_eq!(second.hold_request_id.as_deref(), Some("hold-a"));
    }

    #[tokio::test]
    async fn test_update_status_compares_expected() {
        let store = InMemoryBookingStore::new();
        let user = store.insert_user("alice").await.unwrap();
        let mut booking = store.insert_pending(new_booking(user.id, "req-1")).await.unwrap();

        booking.confirm().unwrap();
        store
            .update_status(&booking, BookingStatus::Pending)
            .await
            .unwrap();

        let result = store.update_status(&booking, BookingStatus::Pending).await;
        assert!(matches!(
            result,
            Err(BookingError::ConcurrentModification { .. })
        ));

        let stored = store.get(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_list_for_user_pages_by_id() {
        let store = InMemoryBookingStore::new();
        let alice = store.insert_user("alice").await.unwrap();
        let bob = store.insert_user("bob").await.unwrap();
        for i in 0..5 {
            store
                .insert_pending(new_booking(alice.id, &format!("a-{i}")))
                .await
                .unwrap();
        }
        store.insert_pending(new_booking(bob.id, "b-0")).await.unwrap();

        let page = store
            .list_for_user(alice.id, PageRequest::new(1, 2))
            .await
            .unwrap();

        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
        let request_ids: Vec<_> = page.content.iter().map(|b| b.request_id.as_str()).collect();
        assert_eq!(request_ids, vec!["a-2", "a-3"]);
    }

    #[tokio::test]
    async fn test_find_users() {
        let store = InMemoryBookingStore::new();
        let user = store.insert_user("alice").await.unwrap();

        assert_eq!(store.find_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_user_by_username("alice").await.unwrap(), Some(user));
        assert!(store.find_user(UserId::new(42)).await.unwrap().is_none());
    }
}
