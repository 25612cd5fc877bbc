use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tourvia_booking::models::{Booking, BookingPatch, BookingStatus};
use tourvia_booking::repository::BookingRepository;
use tourvia_catalog::repository::BookingCounter;
use tourvia_core::{CoreError, CoreResult};
use uuid::Uuid;

use super::{codec_err, db_err};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: serde_json::Value) -> CoreResult<Booking> {
        serde_json::from_value(doc).map_err(codec_err)
    }

    async fn fetch_docs(&self, query: &str, id: Uuid) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query(query)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .collect()
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        let doc = serde_json::to_value(booking).map_err(codec_err)?;
        sqlx::query(
            r#"
            INSERT INTO bookings (id, tour_id, customer_id, guide_id, status, doc, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id)
        .bind(booking.tour_id)
        .bind(booking.customer_id)
        .bind(booking.guide_id)
        .bind(booking.status.as_str())
        .bind(doc)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query("SELECT doc FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .transpose()
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch_docs(
            "SELECT doc FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC",
            customer_id,
        )
        .await
    }

    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<Booking>> {
        self.fetch_docs(
            "SELECT doc FROM bookings WHERE guide_id = $1 ORDER BY created_at DESC",
            guide_id,
        )
        .await
    }

    /// Compare-and-swap under a row lock: the expected status is
    /// re-checked after the lock is held, so of two racing writers exactly
    /// one commits and the other sees `Conflict`.
    async fn update_if_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        patch: BookingPatch,
    ) -> CoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query("SELECT doc FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", id)))?;
        let mut booking = Self::decode(row.try_get("doc").map_err(db_err)?)?;

        if booking.status != expected {
            return Err(CoreError::Conflict(format!(
                "booking is {}, expected {}",
                booking.status.as_str(),
                expected.as_str()
            )));
        }
        if !expected.can_transition_to(patch.next) {
            return Err(CoreError::Conflict(format!(
                "transition {} -> {} is not allowed",
                expected.as_str(),
                patch.next.as_str()
            )));
        }
        booking.apply(&patch);

        let doc = serde_json::to_value(&booking).map_err(codec_err)?;
        sqlx::query("UPDATE bookings SET status = $2, doc = $3, updated_at = $4 WHERE id = $1")
            .bind(id)
            .bind(booking.status.as_str())
            .bind(doc)
            .bind(booking.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(booking)
    }

    async fn list_stale(
        &self,
        status: BookingStatus,
        older_than: DateTime<Utc>,
    ) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query("SELECT doc FROM bookings WHERE status = $1 AND updated_at < $2")
            .bind(status.as_str())
            .bind(older_than)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .collect()
    }
}

#[async_trait]
impl BookingCounter for PgBookingRepository {
    async fn count_blocking(&self, tour_id: Uuid) -> CoreResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM bookings WHERE tour_id = $1 AND status <> 'CANCELED'",
        )
        .bind(tour_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        let n: i64 = row.try_get("n").map_err(db_err)?;
        Ok(n as u64)
    }
}
