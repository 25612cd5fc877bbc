use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tourvia_core::CoreResult;
use tourvia_shared::Money;
use uuid::Uuid;

use crate::ledger::{LedgerEntry, LedgerStatus};
use crate::models::{Booking, BookingPatch, BookingStatus};

/// Data access port for bookings. The contract every implementation must
/// honor: `update_if_status` is a compare-and-swap on the current status.
/// When two writers race, exactly one sees its expected status and wins;
/// the other gets `Conflict`.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: &Booking) -> CoreResult<()>;
    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>>;
    async fn list_for_customer(&self, customer_id: Uuid) -> CoreResult<Vec<Booking>>;
    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<Booking>>;
    /// Atomic conditional update keyed on the expected current status.
    /// `NotFound` if the booking does not exist, `Conflict` if the status
    /// no longer matches.
    async fn update_if_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        patch: BookingPatch,
    ) -> CoreResult<Booking>;
    /// Bookings sitting in `status` whose last transition happened before
    /// `older_than`; feeds the timeout sweep. Staleness is measured from
    /// `updated_at`, not from creation, so each status gets its full window.
    async fn list_stale(
        &self,
        status: BookingStatus,
        older_than: DateTime<Utc>,
    ) -> CoreResult<Vec<Booking>>;
}

/// Data access port for the settlement ledger.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert a payout unless one already exists for the same booking.
    /// Returns false when the booking was already settled; the caller
    /// treats that as a successful no-op.
    async fn insert_payout_once(&self, entry: &LedgerEntry) -> CoreResult<bool>;
    /// Balance check and insert in one atomic section, so concurrent
    /// requests from the same guide cannot overdraw. `Validation` when the
    /// available balance is insufficient.
    async fn insert_withdrawal_checked(&self, entry: &LedgerEntry) -> CoreResult<()>;
    async fn get(&self, id: Uuid) -> CoreResult<Option<LedgerEntry>>;
    /// Conditional write keyed on `status = PENDING`.
    async fn decide_withdrawal(
        &self,
        id: Uuid,
        status: LedgerStatus,
        decided_by: Uuid,
    ) -> CoreResult<LedgerEntry>;
    async fn entries_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<LedgerEntry>>;
    async fn list_pending_withdrawals(&self) -> CoreResult<Vec<LedgerEntry>>;
    async fn list_all(&self) -> CoreResult<Vec<LedgerEntry>>;
    async fn available_balance(&self, guide_id: Uuid) -> CoreResult<Money>;
}
