use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use tourvia_catalog::repository::BusyCalendar;
use tourvia_core::CoreResult;
use uuid::Uuid;

use super::db_err;

pub struct PgBusyCalendar {
    pool: PgPool,
}

impl PgBusyCalendar {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusyCalendar for PgBusyCalendar {
    async fn mark(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<()> {
        // Idempotent set insert; re-marking the same day is a no-op.
        sqlx::query(
            "INSERT INTO busy_dates (guide_id, busy_on) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(guide_id)
        .bind(date)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn clear(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<()> {
        sqlx::query("DELETE FROM busy_dates WHERE guide_id = $1 AND busy_on = $2")
            .bind(guide_id)
            .bind(date)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn is_busy(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM busy_dates WHERE guide_id = $1 AND busy_on = $2) AS busy",
        )
        .bind(guide_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.try_get("busy").map_err(db_err)?)
    }

    async fn list(&self, guide_id: Uuid) -> CoreResult<Vec<NaiveDate>> {
        let rows = sqlx::query("SELECT busy_on FROM busy_dates WHERE guide_id = $1 ORDER BY busy_on")
            .bind(guide_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|r| r.try_get("busy_on").map_err(db_err))
            .collect()
    }
}
