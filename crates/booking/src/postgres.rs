use async_trait::async_trait;
use common::{BookingId, Page, PageRequest, RoomId, UserId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Booking, BookingError, BookingStatus, NewBooking, Result, User, store::BookingStore,
};

const BOOKING_COLUMNS: &str =
    "id, user_id, room_id, start_date, end_date, status, created_at, request_id, hold_request_id";

/// PostgreSQL-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations/booking")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let status: String = row.try_get("status")?;
        Ok(Booking {
            id: BookingId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            room_id: RoomId::new(row.try_get("room_id")?),
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
            request_id: row.try_get("request_id")?,
            hold_request_id: row.try_get("hold_request_id")?,
        })
    }

    fn row_to_user(row: PgRow) -> Result<User> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            username: row.try_get("username")?,
        })
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn insert_user(&self, username: &str) -> Result<User> {
        let row = sqlx::query("INSERT INTO users (username) VALUES ($1) RETURNING id, username")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_user(row)
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username FROM users WHERE id = $1")
            .bind(user_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn insert_pending(&self, booking: NewBooking) -> Result<Booking> {
        // A racing insert with the same key loses on the unique constraint and
        // reads the winner's row instead.
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO bookings (user_id, room_id, start_date, end_date, status, request_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (request_id) DO NOTHING
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.user_id.as_i64())
        .bind(booking.room_id.as_i64())
        .bind(booking.range.start())
        .bind(booking.range.end())
        .bind(BookingStatus::Pending.as_str())
        .bind(&booking.request_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Self::row_to_booking(row),
            None => self
                .find_by_request_id(&booking.request_id)
                .await?
                .ok_or(BookingError::Database(sqlx::Error::RowNotFound)),
        }
    }

    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE request_id = $1"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn record_hold_request(&self, id: BookingId, hold_request_id: &str) -> Result<Booking> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE bookings SET hold_request_id = COALESCE(hold_request_id, $2)
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id.as_i64())
        .bind(hold_request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking)
            .transpose()?
            .ok_or(BookingError::NotFound(id))
    }

    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        let result = sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1 AND status = $3")
            .bind(booking.id.as_i64())
            .bind(booking.status.as_str())
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from a lost race
            return match self.get(booking.id).await? {
                Some(_) => Err(BookingError::ConcurrentModification {
                    id: booking.id,
                    expected,
                }),
                None => Err(BookingError::NotFound(booking.id)),
            };
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId, page: PageRequest) -> Result<Page<Booking>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE user_id = $1")
            .bind(user_id.as_i64())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id.as_i64())
        .bind(i64::from(page.size))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let content = rows
            .into_iter()
            .map(Self::row_to_booking)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(content, page, u64::try_from(total).unwrap_or(0)))
    }
}
