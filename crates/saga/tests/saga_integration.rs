//! Integration tests for the booking saga.

use std::sync::Arc;
use std::time::Duration;

use booking::{BookingError, BookingStatus, BookingStore, InMemoryBookingStore};
use chrono::NaiveDate;
use common::{DateRange, HotelId, RoomDto, RoomId, UserId};
use inventory::{AvailabilityEngine, InMemoryInventoryStore, InventoryStore, NewRoom};
use saga::{
    BookingOrchestrator, CircuitBreaker, CircuitState, CreateBooking, EngineHotelClient,
    HotelCallPolicy, HotelClientError, InMemoryHotelClient, RetryPolicy, SagaError,
};

type TestOrchestrator = BookingOrchestrator<InMemoryBookingStore, InMemoryHotelClient>;

fn stay(start: u32, end: u32) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2026, 6, start).unwrap(),
        NaiveDate::from_ymd_opt(2026, 6, end).unwrap(),
    )
    .unwrap()
}

fn fast_policy(max_attempts: u32, threshold: u32) -> HotelCallPolicy {
    HotelCallPolicy::new(
        RetryPolicy::new(max_attempts, Duration::from_millis(1)),
        CircuitBreaker::new("hotel", threshold, Duration::from_secs(60)),
        Duration::from_millis(500),
    )
}

fn room(id: i64, times_booked: u64) -> RoomDto {
    RoomDto {
        room_id: RoomId::new(id),
        hotel_id: HotelId::new(1),
        number: Some(format!("{}", 100 + id)),
        available: true,
        times_booked,
    }
}

struct TestHarness {
    orchestrator: TestOrchestrator,
    bookings: InMemoryBookingStore,
    hotel: InMemoryHotelClient,
    user_id: UserId,
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_policy(fast_policy(3, 10)).await
    }

    async fn with_policy(policy: HotelCallPolicy) -> Self {
        let bookings = InMemoryBookingStore::new();
        let hotel = InMemoryHotelClient::new();
        let user = bookings.insert_user("alice").await.unwrap();
        let orchestrator = BookingOrchestrator::new(bookings.clone(), hotel.clone(), policy);

        Self {
            orchestrator,
            bookings,
            hotel,
            user_id: user.id,
        }
    }

    fn command(&self, room_id: Option<i64>, request_id: &str) -> CreateBooking {
        CreateBooking {
            user_id: self.user_id,
            room_id: room_id.map(RoomId::new),
            range: stay(1, 4),
            auto_select: false,
            request_id: request_id.to_string(),
        }
    }
}

#[tokio::test]
async fn test_happy_path_confirms_booking() {
    let h = TestHarness::new().await;

    let booking = h
        .orchestrator
        .create_booking(h.command(Some(1), "req-1"))
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.room_id, RoomId::new(1));
    let hold_id = booking.hold_request_id.clone().unwrap();
    assert!(h.hotel.has_hold(&hold_id));
    assert_eq!(h.hotel.confirm_request_ids(), vec![hold_id]);

    let stored = h.bookings.get(booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_conflict_compensates_without_retry() {
    let h = TestHarness::new().await;
    h.hotel.set_conflict(RoomId::new(1));

    let result = h.orchestrator.create_booking(h.command(Some(1), "req-1")).await;

    let booking_id = match result {
        Err(SagaError::Compensated { booking_id, .. }) => booking_id,
        other => panic!("expected compensation, got {other:?}"),
    };
    let stored = h.bookings.get(booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
    assert_eq!(h.hotel.confirm_calls(), 1);

    // The release targets the hold id recorded before the call
    let hold_id = stored.hold_request_id.unwrap();
    assert_eq!(h.hotel.released_request_ids(), vec![hold_id]);
}

#[tokio::test]
async fn test_transient_failures_are_retried_with_same_hold_id() {
    let h = TestHarness::new().await;
    h.hotel.set_transient_confirm_failures(2);

    let booking = h
        .orchestrator
        .create_booking(h.command(Some(1), "req-1"))
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    let ids = h.hotel.confirm_request_ids();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| Some(id) == booking.hold_request_id.as_ref()));
    assert_eq!(h.hotel.hold_count(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_compensate() {
    let h = TestHarness::with_policy(fast_policy(2, 10)).await;
    h.hotel.set_fail_on_confirm(true);

    let result = h.orchestrator.create_booking(h.command(Some(1), "req-1")).await;

    assert!(matches!(result, Err(SagaError::Compensated { .. })));
    assert_eq!(h.hotel.confirm_calls(), 2);
    assert_eq!(h.hotel.released_request_ids().len(), 1);
}

#[tokio::test]
async fn test_replayed_request_returns_same_booking() {
    let h = TestHarness::new().await;

    let first = h
        .orchestrator
        .create_booking(h.command(Some(1), "req-1"))
        .await
        .unwrap();
    // A replay naming another room still resolves to the recorded booking
    let second = h
        .orchestrator
        .create_booking(h.command(Some(2), "req-1"))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.room_id, RoomId::new(1));
    assert_eq!(h.hotel.confirm_calls(), 1);
    assert_eq!(h.bookings.booking_count().await, 1);
}

#[tokio::test]
async fn test_replay_of_cancelled_booking_reports_compensation() {
    let h = TestHarness::new().await;
    h.hotel.set_conflict(RoomId::new(1));
    assert!(h.orchestrator.create_booking(h.command(Some(1), "req-1")).await.is_err());

    let replay = h.orchestrator.create_booking(h.command(Some(1), "req-1")).await;

    assert!(matches!(replay, Err(SagaError::Compensated { .. })));
    assert_eq!(h.hotel.confirm_calls(), 1);
    assert_eq!(h.bookings.booking_count().await, 1);
}

#[tokio::test]
async fn test_auto_select_takes_least_loaded_room() {
    let h = TestHarness::new().await;
    h.hotel.set_recommended(vec![room(3, 0), room(1, 2)]);

    let mut cmd = h.command(None, "req-1");
    cmd.auto_select = true;
    let booking = h.orchestrator.create_booking(cmd).await.unwrap();

    assert_eq!(booking.room_id, RoomId::new(3));
    assert_eq!(booking.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn test_auto_select_ignores_given_room() {
    let h = TestHarness::new().await;
    h.hotel.set_recommended(vec![room(2, 0)]);

    let mut cmd = h.command(Some(7), "req-1");
    cmd.auto_select = true;
    let booking = h.orchestrator.create_booking(cmd).await.unwrap();

    assert_eq!(booking.room_id, RoomId::new(2));
}

#[tokio::test]
async fn test_auto_select_without_rooms_writes_nothing() {
    let h = TestHarness::new().await;

    let mut cmd = h.command(None, "req-1");
    cmd.auto_select = true;
    let result = h.orchestrator.create_booking(cmd).await;

    assert!(matches!(result, Err(SagaError::NoRoomsAvailable)));
    assert_eq!(h.bookings.booking_count().await, 0);
    assert_eq!(h.hotel.confirm_calls(), 0);
}

#[tokio::test]
async fn test_room_required_without_auto_select() {
    let h = TestHarness::new().await;

    let result = h.orchestrator.create_booking(h.command(None, "req-1")).await;

    assert!(matches!(result, Err(SagaError::RoomRequired)));
    assert_eq!(h.bookings.booking_count().await, 0);
}

#[tokio::test]
async fn test_blank_request_id_is_rejected() {
    let h = TestHarness::new().await;

    let result = h.orchestrator.create_booking(h.command(Some(1), "  ")).await;

    assert!(matches!(
        result,
        Err(SagaError::Booking(BookingError::MissingRequestId))
    ));
}

#[tokio::test]
async fn test_unknown_user_is_rejected() {
    let h = TestHarness::new().await;
    let mut cmd = h.command(Some(1), "req-1");
    cmd.user_id = UserId::new(999);

    let result = h.orchestrator.create_booking(cmd).await;

    assert!(matches!(
        result,
        Err(SagaError::Booking(BookingError::UserNotFound(_)))
    ));
    assert_eq!(h.hotel.confirm_calls(), 0);
}

#[tokio::test]
async fn test_release_failure_still_cancels() {
    let h = TestHarness::new().await;
    h.hotel.set_conflict(RoomId::new(1));
    h.hotel.set_fail_on_release(true);

    let result = h.orchestrator.create_booking(h.command(Some(1), "req-1")).await;

    let Err(SagaError::Compensated { booking_id, .. }) = result else {
        panic!("expected compensation");
    };
    let stored = h.bookings.get(booking_id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
    // Release went through the retry policy as well
    assert_eq!(h.hotel.released_request_ids().len(), 3);
}

#[tokio::test]
async fn test_open_breaker_fails_fast() {
    let h = TestHarness::with_policy(fast_policy(1, 2)).await;
    h.hotel.set_fail_on_confirm(true);
    h.hotel.set_fail_on_release(true);

    // One failed confirm plus one failed release trips the breaker
    let first = h.orchestrator.create_booking(h.command(Some(1), "req-1")).await;
    assert!(matches!(first, Err(SagaError::Compensated { .. })));
    assert_eq!(
        h.orchestrator.policy().breaker().state().await,
        CircuitState::Open
    );

    let second = h.orchestrator.create_booking(h.command(Some(2), "req-2")).await;

    let Err(SagaError::Compensated { reason, .. }) = second else {
        panic!("expected compensation");
    };
    assert_eq!(reason, HotelClientError::CircuitOpen.to_string());
    assert_eq!(h.hotel.confirm_calls(), 1);
}

#[tokio::test]
async fn test_slow_confirm_times_out_and_compensates() {
    let policy = HotelCallPolicy::new(
        RetryPolicy::no_retry(),
        CircuitBreaker::new("hotel", 10, Duration::from_secs(60)),
        Duration::from_millis(20),
    );
    let h = TestHarness::with_policy(policy).await;
    h.hotel.set_confirm_delay(Duration::from_millis(300));

    let result = h.orchestrator.create_booking(h.command(Some(1), "req-1")).await;

    let Err(SagaError::Compensated { reason, .. }) = result else {
        panic!("expected compensation");
    };
    assert_eq!(reason, HotelClientError::Timeout.to_string());
    assert_eq!(h.hotel.hold_count(), 0);
}

#[tokio::test]
async fn test_cancel_confirmed_booking_releases_hold() {
    let h = TestHarness::new().await;
    let booking = h
        .orchestrator
        .create_booking(h.command(Some(1), "req-1"))
        .await
        .unwrap();
    let hold_id = booking.hold_request_id.clone().unwrap();

    let cancelled = h
        .orchestrator
        .cancel_and_compensate(booking.id, &hold_id)
        .await
        .unwrap();

    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(!h.hotel.has_hold(&hold_id));

    // Cancelling again changes nothing and makes no further call
    h.orchestrator
        .cancel_and_compensate(booking.id, &hold_id)
        .await
        .unwrap();
    assert_eq!(h.hotel.released_request_ids().len(), 1);
}

#[tokio::test]
async fn test_confirm_cancelled_booking_makes_no_call() {
    let h = TestHarness::new().await;
    let pending = h
        .orchestrator
        .create_pending(h.user_id, RoomId::new(1), stay(1, 4), "req-1")
        .await
        .unwrap();
    h.orchestrator
        .cancel_and_compensate(pending.id, "unused")
        .await
        .unwrap();

    let result = h.orchestrator.confirm(pending.id).await;

    assert!(matches!(
        result,
        Err(SagaError::Booking(BookingError::InvalidTransition { .. }))
    ));
    assert_eq!(h.hotel.confirm_calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_confirm_releases_late_hold() {
    let h = TestHarness::new().await;
    h.hotel.set_confirm_delay(Duration::from_millis(100));
    let orchestrator = Arc::new(h.orchestrator);

    let saga = {
        let orchestrator = Arc::clone(&orchestrator);
        let cmd = CreateBooking {
            user_id: h.user_id,
            room_id: Some(RoomId::new(1)),
            range: stay(1, 4),
            auto_select: false,
            request_id: "req-1".to_string(),
        };
        tokio::spawn(async move { orchestrator.create_booking(cmd).await })
    };

    // Cancel while the confirm call is still in flight
    tokio::time::sleep(Duration::from_millis(30)).await;
    let pending = h.bookings.find_by_request_id("req-1").await.unwrap().unwrap();
    assert_eq!(pending.status, BookingStatus::Pending);
    let hold_id = pending.hold_request_id.clone().unwrap();
    orchestrator
        .cancel_and_compensate(pending.id, &hold_id)
        .await
        .unwrap();
    assert!(!h.hotel.has_hold(&hold_id));

    let result = saga.await.unwrap();

    assert!(matches!(result, Err(SagaError::Compensated { .. })));
    // The hold landed after the cancel's release and was released again
    assert_eq!(h.hotel.hold_count(), 0);
    assert_eq!(h.hotel.released_request_ids(), vec![hold_id.clone(), hold_id]);
    let stored = h.bookings.get(pending.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_request_id_of_another_user_is_refused() {
    let h = TestHarness::new().await;
    let first = h
        .orchestrator
        .create_booking(h.command(Some(1), "req-1"))
        .await
        .unwrap();
    let bob = h.bookings.insert_user("bob").await.unwrap();

    let mut cmd = h.command(Some(1), "req-1");
    cmd.user_id = bob.id;
    let replay = h.orchestrator.create_booking(cmd).await;
    let pending = h
        .orchestrator
        .create_pending(bob.id, RoomId::new(1), stay(1, 4), "req-1")
        .await;

    assert!(matches!(replay, Err(SagaError::RequestIdTaken(ref id)) if id == "req-1"));
    assert!(matches!(pending, Err(SagaError::RequestIdTaken(_))));
    let stored = h.bookings.get(first.id).await.unwrap().unwrap();
    assert_eq!(stored.user_id, h.user_id);
    assert_eq!(h.hotel.confirm_calls(), 1);
}

#[tokio::test]
async fn test_confirm_is_idempotent() {
    let h = TestHarness::new().await;
    let pending = h
        .orchestrator
        .create_pending(h.user_id, RoomId::new(1), stay(1, 4), "req-1")
        .await
        .unwrap();

    let first = h.orchestrator.confirm(pending.id).await.unwrap();
    let second = h.orchestrator.confirm(pending.id).await.unwrap();

    assert_eq!(first.status, BookingStatus::Confirmed);
    assert_eq!(second.hold_request_id, first.hold_request_id);
    assert_eq!(h.hotel.confirm_calls(), 1);
}

#[tokio::test]
async fn test_create_pending_is_idempotent() {
    let h = TestHarness::new().await;

    let first = h
        .orchestrator
        .create_pending(h.user_id, RoomId::new(1), stay(1, 4), "req-1")
        .await
        .unwrap();
    let second = h
        .orchestrator
        .create_pending(h.user_id, RoomId::new(1), stay(1, 4), "req-1")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.status, BookingStatus::Pending);
    assert_eq!(h.bookings.booking_count().await, 1);
}

#[tokio::test]
async fn test_confirm_unknown_booking_is_not_found() {
    let h = TestHarness::new().await;

    let result = h.orchestrator.confirm(common::BookingId::new(42)).await;

    assert!(matches!(
        result,
        Err(SagaError::Booking(BookingError::NotFound(_)))
    ));
}

async fn engine_orchestrator() -> (
    Arc<BookingOrchestrator<InMemoryBookingStore, EngineHotelClient<InMemoryInventoryStore>>>,
    Arc<AvailabilityEngine<InMemoryInventoryStore>>,
    Vec<UserId>,
) {
    let inventory = InMemoryInventoryStore::new();
    inventory
        .add_room(NewRoom::new(HotelId::new(1), "101"))
        .await
        .unwrap();
    inventory
        .add_room(NewRoom::new(HotelId::new(1), "102").with_times_booked(5))
        .await
        .unwrap();
    let engine = Arc::new(AvailabilityEngine::new(inventory));

    let bookings = InMemoryBookingStore::new();
    let mut users = Vec::new();
    for i in 0..8 {
        users.push(bookings.insert_user(&format!("user-{i}")).await.unwrap().id);
    }

    let orchestrator = BookingOrchestrator::new(
        bookings,
        EngineHotelClient::new(Arc::clone(&engine)),
        fast_policy(3, 10),
    );
    (Arc::new(orchestrator), engine, users)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_competing_bookings_for_same_room_one_wins() {
    let (orchestrator, engine, users) = engine_orchestrator().await;

    let mut handles = Vec::new();
    for (i, user_id) in users.iter().copied().enumerate() {
        let orchestrator = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            orchestrator
                .create_booking(CreateBooking {
                    user_id,
                    room_id: Some(RoomId::new(1)),
                    range: stay(10, 13),
                    auto_select: false,
                    request_id: format!("req-{i}"),
                })
                .await
        }));
    }

    let mut confirmed = 0;
    let mut compensated = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => {
                assert_eq!(booking.status, BookingStatus::Confirmed);
                confirmed += 1;
            }
            Err(SagaError::Compensated { .. }) => compensated += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(confirmed, 1);
    assert_eq!(compensated, users.len() - 1);
    assert_eq!(engine.store().hold_count().await, 1);
    let room = engine.store().get_room(RoomId::new(1)).await.unwrap().unwrap();
    assert_eq!(room.times_booked, 1);
}

#[tokio::test]
async fn test_auto_select_against_engine_and_cancel() {
    let (orchestrator, engine, users) = engine_orchestrator().await;

    let booking = orchestrator
        .create_booking(CreateBooking {
            user_id: users[0],
            room_id: None,
            range: stay(1, 3),
            auto_select: true,
            request_id: "req-auto".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(booking.room_id, RoomId::new(1));
    assert_eq!(engine.store().hold_count().await, 1);

    let hold_id = booking.hold_request_id.clone().unwrap();
    orchestrator
        .cancel_and_compensate(booking.id, &hold_id)
        .await
        .unwrap();

    assert_eq!(engine.store().hold_count().await, 0);
    let room = engine.store().get_room(RoomId::new(1)).await.unwrap().unwrap();
    assert_eq!(room.times_booked, 0);
}

#[tokio::test]
async fn test_unknown_room_against_engine_compensates() {
    let (orchestrator, _engine, users) = engine_orchestrator().await;

    let result = orchestrator
        .create_booking(CreateBooking {
            user_id: users[0],
            room_id: Some(RoomId::new(99)),
            range: stay(1, 3),
            auto_select: false,
            request_id: "req-missing".to_string(),
        })
        .await;

    let Err(SagaError::Compensated { reason, .. }) = result else {
        panic!("expected compensation");
    };
    assert_eq!(reason, HotelClientError::RoomNotFound(RoomId::new(99)).to_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates_share_one_booking_and_hold() {
    let (orchestrator, engine, users) = engine_orchestrator().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orchestrator = Arc::clone(&orchestrator);
        let user_id = users[0];
        handles.push(tokio::spawn(async move {
            orchestrator
                .create_booking(CreateBooking {
                    user_id,
                    room_id: Some(RoomId::new(2)),
                    range: stay(20, 22),
                    auto_select: false,
                    request_id: "req-dup".to_string(),
                })
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let booking = handle.await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        ids.push(booking.id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(orchestrator.bookings().booking_count().await, 1);
    assert_eq!(engine.store().hold_count().await, 1);
}
