use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tourvia_core::CoreResult;
use uuid::Uuid;

use crate::requests::{RequestStatus, TourRequest};
use crate::tour::{Tour, TourChanges, TourStatus};

/// Data access port for published tours.
#[async_trait]
pub trait TourRepository: Send + Sync {
    async fn insert(&self, tour: &Tour) -> CoreResult<()>;
    async fn get(&self, id: Uuid) -> CoreResult<Option<Tour>>;
    async fn list_active(&self) -> CoreResult<Vec<Tour>>;
    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<Tour>>;
    async fn set_status(&self, id: Uuid, status: TourStatus) -> CoreResult<()>;
    async fn set_edit_window(&self, id: Uuid, until: DateTime<Utc>) -> CoreResult<()>;
    /// Apply guide-editable fields and bump `updated_at`.
    async fn apply_changes(&self, id: Uuid, changes: &TourChanges) -> CoreResult<Tour>;
}

/// Data access port for tour requests.
#[async_trait]
pub trait TourRequestRepository: Send + Sync {
    /// Insert a new request. Returns `Conflict` if a pending request for
    /// the same (tour, guide) pair already exists.
    async fn insert(&self, request: &TourRequest) -> CoreResult<()>;
    async fn get(&self, id: Uuid) -> CoreResult<Option<TourRequest>>;
    async fn list_pending(&self) -> CoreResult<Vec<TourRequest>>;
    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<TourRequest>>;
    /// Conditional write keyed on `status = PENDING`: exactly one of two
    /// racing decisions lands, the other gets `Conflict`.
    async fn decide(
        &self,
        id: Uuid,
        status: RequestStatus,
        decided_by: Uuid,
        notes: Option<String>,
    ) -> CoreResult<TourRequest>;
    /// Withdraw a still-pending request. Only the submitting guide may do
    /// this; a decided request is immutable.
    async fn cancel_pending(&self, id: Uuid, guide_id: Uuid) -> CoreResult<()>;
}

/// Guide availability calendar. Mark and clear are idempotent set
/// operations, so callers never need a delete-then-recreate dance.
#[async_trait]
pub trait BusyCalendar: Send + Sync {
    async fn mark(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<()>;
    async fn clear(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<()>;
    async fn is_busy(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<bool>;
    async fn list(&self, guide_id: Uuid) -> CoreResult<Vec<NaiveDate>>;
}

/// Narrow view of the booking collection the approval workflow needs: a
/// tour may only be retired when nothing but canceled bookings reference
/// it. Implemented by the booking store.
#[async_trait]
pub trait BookingCounter: Send + Sync {
    /// Bookings for this tour in any status other than CANCELED.
    async fn count_blocking(&self, tour_id: Uuid) -> CoreResult<u64>;
}
