use async_trait::async_trait;
use chrono::NaiveDate;
use common::{DateRange, HotelId, RoomId};
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};

use crate::{
    HoldOutcome, InventoryError, NewHold, NewRoom, Rejection, Result, Room, RoomHold,
    store::InventoryStore,
};

const REQUEST_ID_CONSTRAINT: &str = "room_holds_request_id_key";

const HOLD_COLUMNS: &str = "id, room_id, start_date, end_date, request_id, booking_id";

/// PostgreSQL-backed room store and hold ledger.
///
/// Hold placement runs in one transaction that takes `SELECT ... FOR UPDATE`
/// on the room row; the unique constraint on `request_id` backs up the
/// idempotency check across rooms.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/hotel")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_room(row: PgRow) -> Result<Room> {
        let times_booked: i64 = row.try_get("times_booked")?;
        Ok(Room {
            id: RoomId::new(row.try_get("id")?),
            hotel_id: HotelId::new(row.try_get("hotel_id")?),
            number: row.try_get("number")?,
            available: row.try_get("available")?,
            times_booked: u64::try_from(times_booked).unwrap_or(0),
        })
    }

    fn row_to_hold(row: PgRow) -> Result<RoomHold> {
        let range = DateRange::new(row.try_get("start_date")?, row.try_get("end_date")?)?;
        Ok(RoomHold {
            id: row.try_get("id")?,
            room_id: RoomId::new(row.try_get("room_id")?),
            range,
            request_id: row.try_get("request_id")?,
            booking_id: row.try_get("booking_id")?,
        })
    }

    async fn fetch_hold<'e, E: PgExecutor<'e>>(
        executor: E,
        request_id: &str,
    ) -> Result<Option<RoomHold>> {
        let row = sqlx::query(&format!(
            "SELECT {HOLD_COLUMNS} FROM room_holds WHERE request_id = $1"
        ))
        .bind(request_id)
        .fetch_optional(executor)
        .await?;

        row.map(Self::row_to_hold).transpose()
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn add_room(&self, room: NewRoom) -> Result<Room> {
        let row = sqlx::query(
            r#"
            INSERT INTO rooms (hotel_id, number, available, times_booked)
            VALUES ($1, $2, $3, $4)
            RETURNING id, hotel_id, number, available, times_booked
            "#,
        )
        .bind(room.hotel_id.as_i64())
        .bind(&room.number)
        .bind(room.available)
        .bind(i64::try_from(room.times_booked).unwrap_or(i64::MAX))
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_room(row)
    }

    async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        let row = sqlx::query(
            "SELECT id, hotel_id, number, available, times_booked FROM rooms WHERE id = $1",
        )
        .bind(room_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_room).transpose()
    }

    async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query(
            "SELECT id, hotel_id, number, available, times_booked FROM rooms ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_room).collect()
    }

    async fn rooms_free_for(&self, range: DateRange) -> Result<Vec<Room>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.hotel_id, r.number, r.available, r.times_booked
            FROM rooms r
            WHERE NOT EXISTS (
                SELECT 1 FROM room_holds h
                WHERE h.room_id = r.id AND h.end_date >= $1 AND h.start_date <= $2
            )
            ORDER BY r.id ASC
            "#,
        )
        .bind(range.start())
        .bind(range.end())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_room).collect()
    }

    async fn find_hold(&self, request_id: &str) -> Result<Option<RoomHold>> {
        Self::fetch_hold(&self.pool, request_id).await
    }

    async fn holds_covering(&self, day: NaiveDate) -> Result<Vec<RoomHold>> {
        let rows = sqlx::query(&format!(
            "SELECT {HOLD_COLUMNS} FROM room_holds WHERE start_date <= $1 AND end_date >= $1 ORDER BY id ASC"
        ))
        .bind(day)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_hold).collect()
    }

    async fn place_hold(&self, hold: NewHold) -> Result<HoldOutcome> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the room serializes placements for this room only
        let available: Option<bool> =
            sqlx::query_scalar("SELECT available FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(hold.room_id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
        let Some(available) = available else {
            return Err(InventoryError::RoomNotFound(hold.room_id));
        };

        if let Some(existing) = Self::fetch_hold(&mut *tx, &hold.request_id).await? {
            return Ok(HoldOutcome::Replayed(existing));
        }
        if !available {
            return Ok(HoldOutcome::Rejected(Rejection::RoomDisabled));
        }

        let conflicting: Option<String> = sqlx::query_scalar(
            r#"
            SELECT request_id FROM room_holds
            WHERE room_id = $1 AND end_date >= $2 AND start_date <= $3
            LIMIT 1
            "#,
        )
        .bind(hold.room_id.as_i64())
        .bind(hold.range.start())
        .bind(hold.range.end())
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(request_id) = conflicting {
            return Ok(HoldOutcome::Rejected(Rejection::Overlapping { request_id }));
        }

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO room_holds (room_id, start_date, end_date, request_id, booking_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(hold.room_id.as_i64())
        .bind(hold.range.start())
        .bind(hold.range.end())
        .bind(&hold.request_id)
        .bind(&hold.booking_id)
        .fetch_one(&mut *tx)
        .await;

        let hold_id = match inserted {
            Ok(id) => id,
            Err(sqlx::Error::Database(ref db_err))
                if db_err.constraint() == Some(REQUEST_ID_CONSTRAINT) =>
            {
                // Same key committed concurrently on another room
                tx.rollback().await?;
                return match self.find_hold(&hold.request_id).await? {
                    Some(existing) => Ok(HoldOutcome::Replayed(existing)),
                    None => Err(InventoryError::ConcurrentHold(hold.request_id)),
                };
            }
            Err(e) => return Err(e.into()),
        };

        sqlx::query("UPDATE rooms SET times_booked = times_booked + 1 WHERE id = $1")
            .bind(hold.room_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(HoldOutcome::Placed(RoomHold {
            id: hold_id,
            room_id: hold.room_id,
            range: hold.range,
            request_id: hold.request_id,
            booking_id: hold.booking_id,
        }))
    }

    async fn remove_hold(&self, request_id: &str) -> Result<Option<RoomHold>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "DELETE FROM room_holds WHERE request_id = $1 RETURNING {HOLD_COLUMNS}"
        ))
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let hold = Self::row_to_hold(row)?;

        sqlx::query("UPDATE rooms SET times_booked = GREATEST(times_booked - 1, 0) WHERE id = $1")
            .bind(hold.room_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(hold))
    }
}
