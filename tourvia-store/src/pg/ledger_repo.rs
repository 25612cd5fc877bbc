use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tourvia_booking::ledger::{LedgerEntry, LedgerKind, LedgerStatus};
use tourvia_booking::repository::LedgerRepository;
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::Money;
use uuid::Uuid;

use super::db_err;

const COLUMNS: &str =
    "id, booking_id, guide_id, kind, status, gross, fee, net, created_at, decided_at, decided_by";

pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> CoreResult<LedgerEntry> {
        let kind: String = row.try_get("kind").map_err(db_err)?;
        let status: String = row.try_get("status").map_err(db_err)?;
        Ok(LedgerEntry {
            id: row.try_get("id").map_err(db_err)?,
            booking_id: row.try_get("booking_id").map_err(db_err)?,
            guide_id: row.try_get("guide_id").map_err(db_err)?,
            gross: Money::new(row.try_get("gross").map_err(db_err)?)?,
            fee: Money::new(row.try_get("fee").map_err(db_err)?)?,
            net: Money::new(row.try_get("net").map_err(db_err)?)?,
            kind: LedgerKind::parse(&kind)
                .ok_or_else(|| CoreError::Internal(format!("bad ledger kind {}", kind)))?,
            status: LedgerStatus::parse(&status)
                .ok_or_else(|| CoreError::Internal(format!("bad ledger status {}", status)))?,
            created_at: row.try_get("created_at").map_err(db_err)?,
            decided_at: row.try_get("decided_at").map_err(db_err)?,
            decided_by: row.try_get("decided_by").map_err(db_err)?,
        })
    }

    async fn insert_entry<'e, E>(executor: E, entry: &LedgerEntry) -> CoreResult<u64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger
                (id, booking_id, guide_id, kind, status, gross, fee, net,
                 created_at, decided_at, decided_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.booking_id)
        .bind(entry.guide_id)
        .bind(entry.kind.as_str())
        .bind(entry.status.as_str())
        .bind(entry.gross.units())
        .bind(entry.fee.units())
        .bind(entry.net.units())
        .bind(entry.created_at)
        .bind(entry.decided_at)
        .bind(entry.decided_by)
        .execute(executor)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn insert_payout_once(&self, entry: &LedgerEntry) -> CoreResult<bool> {
        // The partial unique index on booking_id WHERE kind = 'PAYOUT'
        // makes the conflict clause the exactly-once guard.
        let inserted = Self::insert_entry(&self.pool, entry).await?;
        Ok(inserted > 0)
    }

    async fn insert_withdrawal_checked(&self, entry: &LedgerEntry) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        // Serialize balance checks per guide so two concurrent requests
        // cannot both pass against the same funds.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(entry.guide_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(CASE
                WHEN kind = 'PAYOUT' AND status = 'CONFIRMED' THEN net
                WHEN kind = 'WITHDRAWAL' AND status IN ('PENDING', 'CONFIRMED') THEN -net
                ELSE 0 END), 0) AS balance
            FROM ledger WHERE guide_id = $1
            "#,
        )
        .bind(entry.guide_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let balance: i64 = row.try_get("balance").map_err(db_err)?;
        let balance = Money::new(balance.max(0))?;

        if entry.net > balance {
            return Err(CoreError::Validation(format!(
                "withdrawal of {} exceeds the available balance of {}",
                entry.net, balance
            )));
        }

        Self::insert_entry(&mut *tx, entry).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<LedgerEntry>> {
        let row = sqlx::query(&format!("SELECT {} FROM ledger WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| Self::from_row(&r)).transpose()
    }

    async fn decide_withdrawal(
        &self,
        id: Uuid,
        status: LedgerStatus,
        decided_by: Uuid,
    ) -> CoreResult<LedgerEntry> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE ledger SET status = $2, decided_by = $3, decided_at = $4
            WHERE id = $1 AND kind = 'WITHDRAWAL' AND status = 'PENDING'
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(decided_by)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match row {
            Some(row) => Self::from_row(&row),
            // Zero rows: disambiguate for the caller.
            None => match self.get(id).await? {
                None => Err(CoreError::NotFound(format!("ledger entry {}", id))),
                Some(entry) if entry.kind != LedgerKind::Withdrawal => Err(CoreError::Validation(
                    "only withdrawal entries can be decided".into(),
                )),
                Some(_) => Err(CoreError::Conflict("withdrawal already decided".into())),
            },
        }
    }

    async fn entries_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger WHERE guide_id = $1 ORDER BY created_at",
            COLUMNS
        ))
        .bind(guide_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_pending_withdrawals(&self) -> CoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ledger WHERE kind = 'WITHDRAWAL' AND status = 'PENDING' ORDER BY created_at",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_all(&self) -> CoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!("SELECT {} FROM ledger ORDER BY created_at", COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn available_balance(&self, guide_id: Uuid) -> CoreResult<Money> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(CASE
                WHEN kind = 'PAYOUT' AND status = 'CONFIRMED' THEN net
                WHEN kind = 'WITHDRAWAL' AND status IN ('PENDING', 'CONFIRMED') THEN -net
                ELSE 0 END), 0) AS balance
            FROM ledger WHERE guide_id = $1
            "#,
        )
        .bind(guide_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        let balance: i64 = row.try_get("balance").map_err(db_err)?;
        Ok(Money::new(balance.max(0))?)
    }
}
