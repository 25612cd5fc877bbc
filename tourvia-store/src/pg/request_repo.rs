use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use tourvia_catalog::repository::TourRequestRepository;
use tourvia_catalog::requests::{RequestStatus, TourRequest};
use tourvia_core::{CoreError, CoreResult};
use uuid::Uuid;

use super::{codec_err, db_err};

pub struct PgTourRequestRepository {
    pool: PgPool,
}

impl PgTourRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: serde_json::Value) -> CoreResult<TourRequest> {
        serde_json::from_value(doc).map_err(codec_err)
    }
}

#[async_trait]
impl TourRequestRepository for PgTourRequestRepository {
    async fn insert(&self, request: &TourRequest) -> CoreResult<()> {
        let doc = serde_json::to_value(request).map_err(codec_err)?;
        // The partial unique index on (tour_id, guide_id) WHERE PENDING
        // turns a duplicate pending ask into zero affected rows.
        let result = sqlx::query(
            r#"
            INSERT INTO tour_requests (id, tour_id, guide_id, status, doc, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(request.id)
        .bind(request.tour_id)
        .bind(request.guide_id)
        .bind(request.status.as_str())
        .bind(doc)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::Conflict(
                "a pending request already exists for this tour".into(),
            ));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<TourRequest>> {
        let row = sqlx::query("SELECT doc FROM tour_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .transpose()
    }

    async fn list_pending(&self) -> CoreResult<Vec<TourRequest>> {
        let rows = sqlx::query(
            "SELECT doc FROM tour_requests WHERE status = 'PENDING' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .collect()
    }

    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<TourRequest>> {
        let rows = sqlx::query(
            "SELECT doc FROM tour_requests WHERE guide_id = $1 ORDER BY created_at DESC",
        )
        .bind(guide_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(|r| Self::decode(r.try_get("doc").map_err(db_err)?))
            .collect()
    }

    async fn decide(
        &self,
        id: Uuid,
        status: RequestStatus,
        decided_by: Uuid,
        notes: Option<String>,
    ) -> CoreResult<TourRequest> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query("SELECT doc FROM tour_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?
            .ok_or_else(|| CoreError::NotFound(format!("tour request {}", id)))?;
        let mut request = Self::decode(row.try_get("doc").map_err(db_err)?)?;
        if request.status != RequestStatus::Pending {
            return Err(CoreError::Conflict("request already decided".into()));
        }
        request.status = status;
        request.decided_by = Some(decided_by);
        request.decided_at = Some(Utc::now());
        request.admin_notes = notes;

        let doc = serde_json::to_value(&request).map_err(codec_err)?;
        sqlx::query("UPDATE tour_requests SET status = $2, doc = $3 WHERE id = $1")
            .bind(id)
            .bind(request.status.as_str())
            .bind(doc)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(request)
    }

    async fn cancel_pending(&self, id: Uuid, guide_id: Uuid) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(
            "SELECT guide_id, status FROM tour_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or_else(|| CoreError::NotFound(format!("tour request {}", id)))?;

        let owner: Uuid = row.try_get("guide_id").map_err(db_err)?;
        let status: String = row.try_get("status").map_err(db_err)?;
        if owner != guide_id {
            return Err(CoreError::Permission(
                "only the submitting guide may cancel a request".into(),
            ));
        }
        if status != RequestStatus::Pending.as_str() {
            return Err(CoreError::Conflict("request already decided".into()));
        }

        sqlx::query("DELETE FROM tour_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
