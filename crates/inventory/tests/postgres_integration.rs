//! PostgreSQL integration tests for the inventory store.
//!
//! These tests share one PostgreSQL container. Run with:
//!
//! ```bash
//! cargo test -p inventory --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use common::{DateRange, HotelId, RoomId};
use inventory::{
    AvailabilityEngine, HoldOutcome, InventoryError, InventoryStore, NewHold, NewRoom,
    PostgresInventoryStore, Rejection,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/hotel/001_create_inventory_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresInventoryStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE room_holds, rooms RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresInventoryStore::new(pool)
}

fn stay(start: u32, end: u32) -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2026, 5, start).unwrap(),
        NaiveDate::from_ymd_opt(2026, 5, end).unwrap(),
    )
    .unwrap()
}

fn new_hold(room_id: RoomId, range: DateRange, request_id: &str) -> NewHold {
    NewHold {
        room_id,
        range,
        request_id: request_id.to_string(),
        booking_id: "1".to_string(),
    }
}

#[tokio::test]
#[serial]
async fn test_add_and_get_room() {
    let store = get_test_store().await;

    let room = store
        .add_room(NewRoom::new(HotelId::new(3), "301").with_times_booked(2))
        .await
        .unwrap();

    let loaded = store.get_room(room.id).await.unwrap().unwrap();
    assert_eq!(loaded, room);
    assert_eq!(loaded.times_booked, 2);
    assert!(store.get_room(RoomId::new(999)).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_place_hold_and_replay() {
    let store = get_test_store().await;
    let room = store.add_room(NewRoom::new(HotelId::new(1), "101")).await.unwrap();

    let first = store.place_hold(new_hold(room.id, stay(1, 3), "r-1")).await.unwrap();
    let second = store.place_hold(new_hold(room.id, stay(1, 3), "r-1")).await.unwrap();

    let HoldOutcome::Placed(placed) = first else {
        panic!("expected a placed hold, got {first:?}");
    };
    assert_eq!(second, HoldOutcome::Replayed(placed));
    assert_eq!(store.get_room(room.id).await.unwrap().unwrap().times_booked, 1);
}

#[tokio::test]
#[serial]
async fn test_inclusive_overlap_is_rejected() {
    let store = get_test_store().await;
    let room = store.add_room(NewRoom::new(HotelId::new(1), "101")).await.unwrap();
    store.place_hold(new_hold(room.id, stay(1, 3), "r-1")).await.unwrap();

    let outcome = store.place_hold(new_hold(room.id, stay(3, 6), "r-2")).await.unwrap();

    assert_eq!(
        outcome,
        HoldOutcome::Rejected(Rejection::Overlapping {
            request_id: "r-1".to_string()
        })
    );
    assert_eq!(store.get_room(room.id).await.unwrap().unwrap().times_booked, 1);
}

#[tokio::test]
#[serial]
async fn test_disabled_and_unknown_rooms() {
    let store = get_test_store().await;
    let room = store
        .add_room(NewRoom::new(HotelId::new(1), "101").unavailable())
        .await
        .unwrap();

    let disabled = store.place_hold(new_hold(room.id, stay(1, 3), "r-1")).await.unwrap();
    assert_eq!(disabled, HoldOutcome::Rejected(Rejection::RoomDisabled));

    let missing = store.place_hold(new_hold(RoomId::new(999), stay(1, 3), "r-2")).await;
    assert!(matches!(missing, Err(InventoryError::RoomNotFound(_))));
}

#[tokio::test]
#[serial]
async fn test_remove_hold_floors_counter() {
    let store = get_test_store().await;
    let room = store.add_room(NewRoom::new(HotelId::new(1), "101")).await.unwrap();
    store.place_hold(new_hold(room.id, stay(1, 3), "r-1")).await.unwrap();
    sqlx::query("UPDATE rooms SET times_booked = 0 WHERE id = $1")
        .bind(room.id.as_i64())
        .execute(store.pool())
        .await
        .unwrap();

    let removed = store.remove_hold("r-1").await.unwrap();

    assert_eq!(removed.map(|h| h.request_id), Some("r-1".to_string()));
    assert_eq!(store.get_room(room.id).await.unwrap().unwrap().times_booked, 0);
    assert!(store.remove_hold("r-1").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_rooms_free_for_and_holds_covering() {
    let store = get_test_store().await;
    let held = store.add_room(NewRoom::new(HotelId::new(1), "101")).await.unwrap();
    let free = store.add_room(NewRoom::new(HotelId::new(1), "102")).await.unwrap();
    store.place_hold(new_hold(held.id, stay(10, 12), "r-1")).await.unwrap();

    let rooms = store.rooms_free_for(stay(12, 14)).await.unwrap();
    assert_eq!(rooms.iter().map(|r| r.id).collect::<Vec<_>>(), vec![free.id]);

    let covering = store
        .holds_covering(NaiveDate::from_ymd_opt(2026, 5, 11).unwrap())
        .await
        .unwrap();
    assert_eq!(covering.len(), 1);
    assert_eq!(covering[0].room_id, held.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_row_lock_admits_one_overlapping_hold() {
    let store = get_test_store().await;
    let room = store.add_room(NewRoom::new(HotelId::new(1), "101")).await.unwrap();
    let engine = Arc::new(AvailabilityEngine::new(store));

    let mut handles = Vec::new();
    for i in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .confirm_availability(room.id, stay(1, 5), &format!("req-{i}"), "1")
                .await
                .unwrap()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);
    let stored = engine.store().get_room(room.id).await.unwrap().unwrap();
    assert_eq!(stored.times_booked, 1);
}
