use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tourvia_catalog::repository::TourRepository;
use tourvia_catalog::tour::{Tour, TourChanges, TourStatus};
use tourvia_core::{CoreError, CoreResult};
use uuid::Uuid;

use super::{codec_err, db_err};

pub struct PgTourRepository {
    pool: PgPool,
}

impl PgTourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: serde_json::Value) -> CoreResult<Tour> {
        serde_json::from_value(doc).map_err(codec_err)
    }

    /// Row-locked read-modify-write; keeps the status column and the
    /// document in step.
    async fn mutate<F>(&self, id: Uuid, f: F) -> CoreResult<Tour>
    where
        F: FnOnce(&mut Tour),
    {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query("SELECT doc FROM tours WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", id)))?;
        let mut tour = Self::decode(row.try_get("doc").map_err(db_err)?)?;
        f(&mut tour);
        let doc = serde_json::to_value(&tour).map_err(codec_err)?;
        sqlx::query("UPDATE tours SET status = $2, doc = $3 WHERE id = $1")
            .bind(id)
            .bind(tour.status.as_str())
            .bind(doc)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(tour)
    }
}

#[async_trait]
impl TourRepository for PgTourRepository {
    async fn insert(&self, tour: &Tour) -> CoreResult<()> {
        let doc = serde_json::to_value(tour).map_err(codec_err)?;
        sqlx::query("INSERT INTO tours (id, status, doc, created_at) VALUES ($1, $2, $3, $4)")
            .bind(tour.id)
            .bind(tour.status.as_str())
            .bind(doc)
            .bind(tour.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Tour>> {
        let row = sqlx::query("SELECT doc FROM tours WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .transpose()
    }

    async fn list_active(&self) -> CoreResult<Vec<Tour>> {
        let rows = sqlx::query("SELECT doc FROM tours WHERE status IN ('ACTIVE', 'APPROVED')")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.into_iter()
            .map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .collect()
    }

    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<Tour>> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM tours
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(doc->'guides') g
                WHERE g->>'guide_id' = $1
            )
            "#,
        )
        .bind(guide_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .collect()
    }

    async fn set_status(&self, id: Uuid, status: TourStatus) -> CoreResult<()> {
        self.mutate(id, |tour| {
            tour.status = status;
            tour.updated_at = Utc::now();
        })
        .await?;
        Ok(())
    }

    async fn set_edit_window(&self, id: Uuid, until: DateTime<Utc>) -> CoreResult<()> {
        self.mutate(id, |tour| {
            tour.edit_allowed_until = Some(until);
            tour.updated_at = Utc::now();
        })
        .await?;
        Ok(())
    }

    async fn apply_changes(&self, id: Uuid, changes: &TourChanges) -> CoreResult<Tour> {
        self.mutate(id, |tour| changes.apply_to(tour)).await
    }
}
