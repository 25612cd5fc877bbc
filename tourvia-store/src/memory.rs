//! In-memory repositories with the same conditional-write semantics as the
//! Postgres implementations. Used by tests and local single-process runs;
//! every CAS happens under one mutex section, mirroring the row lock the
//! database takes.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tourvia_booking::ledger::{self, LedgerEntry, LedgerKind, LedgerStatus};
use tourvia_booking::models::{Booking, BookingPatch, BookingStatus};
use tourvia_booking::repository::{BookingRepository, LedgerRepository};
use tourvia_catalog::repository::{
    BookingCounter, BusyCalendar, TourRepository, TourRequestRepository,
};
use tourvia_catalog::requests::{RequestStatus, TourRequest};
use tourvia_catalog::tour::{Tour, TourChanges, TourStatus};
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::Money;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> CoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CoreError::Internal("repository mutex poisoned".into()))
}

#[derive(Default)]
pub struct InMemoryTourRepository {
    tours: Mutex<HashMap<Uuid, Tour>>,
}

impl InMemoryTourRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TourRepository for InMemoryTourRepository {
    async fn insert(&self, tour: &Tour) -> CoreResult<()> {
        lock(&self.tours)?.insert(tour.id, tour.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Tour>> {
        Ok(lock(&self.tours)?.get(&id).cloned())
    }

    async fn list_active(&self) -> CoreResult<Vec<Tour>> {
        Ok(lock(&self.tours)?
            .values()
            .filter(|t| matches!(t.status, TourStatus::Active | TourStatus::Approved))
            .cloned()
            .collect())
    }

    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<Tour>> {
        Ok(lock(&self.tours)?
            .values()
            .filter(|t| t.has_guide(guide_id))
            .cloned()
            .collect())
    }

    async fn set_status(&self, id: Uuid, status: TourStatus) -> CoreResult<()> {
        let mut tours = lock(&self.tours)?;
        let tour = tours
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", id)))?;
        tour.status = status;
        tour.updated_at = Utc::now();
        Ok(())
    }

    async fn set_edit_window(&self, id: Uuid, until: DateTime<Utc>) -> CoreResult<()> {
        let mut tours = lock(&self.tours)?;
        let tour = tours
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", id)))?;
        tour.edit_allowed_until = Some(until);
        tour.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_changes(&self, id: Uuid, changes: &TourChanges) -> CoreResult<Tour> {
        let mut tours = lock(&self.tours)?;
        let tour = tours
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", id)))?;
        changes.apply_to(tour);
        Ok(tour.clone())
    }
}

#[derive(Default)]
pub struct InMemoryTourRequestRepository {
    requests: Mutex<HashMap<Uuid, TourRequest>>,
}

impl InMemoryTourRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TourRequestRepository for InMemoryTourRequestRepository {
    async fn insert(&self, request: &TourRequest) -> CoreResult<()> {
        let mut requests = lock(&self.requests)?;
        if let Some(tour_id) = request.tour_id {
            let duplicate = requests.values().any(|r| {
                r.tour_id == Some(tour_id)
                    && r.guide_id == request.guide_id
                    && r.status == RequestStatus::Pending
            });
            if duplicate {
                return Err(CoreError::Conflict(
                    "a pending request already exists for this tour".into(),
                ));
            }
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<TourRequest>> {
        Ok(lock(&self.requests)?.get(&id).cloned())
    }

    async fn list_pending(&self) -> CoreResult<Vec<TourRequest>> {
        Ok(lock(&self.requests)?
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<TourRequest>> {
        Ok(lock(&self.requests)?
            .values()
            .filter(|r| r.guide_id == guide_id)
            .cloned()
            .collect())
    }

    async fn decide(
        &self,
        id: Uuid,
        status: RequestStatus,
        decided_by: Uuid,
        notes: Option<String>,
    ) -> CoreResult<TourRequest> {
        let mut requests = lock(&self.requests)?;
        let request = requests
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("tour request {}", id)))?;
        if request.status != RequestStatus::Pending {
            return Err(CoreError::Conflict("request already decided".into()));
        }
        request.status = status;
        request.decided_by = Some(decided_by);
        request.decided_at = Some(Utc::now());
        request.admin_notes = notes;
        Ok(request.clone())
    }

    async fn cancel_pending(&self, id: Uuid, guide_id: Uuid) -> CoreResult<()> {
        let mut requests = lock(&self.requests)?;
        let request = requests
            .get(&id)
            .ok_or_else(|| CoreError::NotFound(format!("tour request {}", id)))?;
        if request.guide_id != guide_id {
            return Err(CoreError::Permission(
                "only the submitting guide may cancel a request".into(),
            ));
        }
        if request.status != RequestStatus::Pending {
            return Err(CoreError::Conflict("request already decided".into()));
        }
        requests.remove(&id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBusyCalendar {
    dates: Mutex<HashSet<(Uuid, NaiveDate)>>,
}

impl InMemoryBusyCalendar {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BusyCalendar for InMemoryBusyCalendar {
    async fn mark(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<()> {
        lock(&self.dates)?.insert((guide_id, date));
        Ok(())
    }

    async fn clear(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<()> {
        lock(&self.dates)?.remove(&(guide_id, date));
        Ok(())
    }

    async fn is_busy(&self, guide_id: Uuid, date: NaiveDate) -> CoreResult<bool> {
        Ok(lock(&self.dates)?.contains(&(guide_id, date)))
    }

    async fn list(&self, guide_id: Uuid) -> CoreResult<Vec<NaiveDate>> {
        let mut dates: Vec<NaiveDate> = lock(&self.dates)?
            .iter()
            .filter(|(g, _)| *g == guide_id)
            .map(|(_, d)| *d)
            .collect();
        dates.sort();
        Ok(dates)
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> CoreResult<()> {
        lock(&self.bookings)?.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(lock(&self.bookings)?.get(&id).cloned())
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(lock(&self.bookings)?
            .values()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn list_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<Booking>> {
        Ok(lock(&self.bookings)?
            .values()
            .filter(|b| b.guide_id == guide_id)
            .cloned()
            .collect())
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        expected: BookingStatus,
        patch: BookingPatch,
    ) -> CoreResult<Booking> {
        let mut bookings = lock(&self.bookings)?;
        let booking = bookings
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", id)))?;
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
        Ok(booking.clone())
    }

    async fn list_stale(
        &self,
        status: BookingStatus,
        older_than: DateTime<Utc>,
    ) -> CoreResult<Vec<Booking>> {
        Ok(lock(&self.bookings)?
            .values()
            .filter(|b| b.status == status && b.updated_at < older_than)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingCounter for InMemoryBookingRepository {
    async fn count_blocking(&self, tour_id: Uuid) -> CoreResult<u64> {
        Ok(lock(&self.bookings)?
            .values()
            .filter(|b| b.tour_id == tour_id && b.status != BookingStatus::Canceled)
            .count() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryLedgerRepository {
    entries: Mutex<HashMap<Uuid, LedgerEntry>>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn guide_entries(entries: &HashMap<Uuid, LedgerEntry>, guide_id: Uuid) -> Vec<LedgerEntry> {
        entries
            .values()
            .filter(|e| e.guide_id == guide_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn insert_payout_once(&self, entry: &LedgerEntry) -> CoreResult<bool> {
        let mut entries = lock(&self.entries)?;
        let already_settled = entries
            .values()
            .any(|e| e.kind == LedgerKind::Payout && e.booking_id == entry.booking_id);
        if already_settled {
            return Ok(false);
        }
        entries.insert(entry.id, entry.clone());
        Ok(true)
    }

    async fn insert_withdrawal_checked(&self, entry: &LedgerEntry) -> CoreResult<()> {
        // Check-then-insert under the one lock, the in-memory equivalent
        // of the store's single-transaction balance guard.
        let mut entries = lock(&self.entries)?;
        let balance = ledger::available_balance(&Self::guide_entries(&entries, entry.guide_id));
        if entry.net > balance {
            return Err(CoreError::Validation(format!(
                "withdrawal of {} exceeds the available balance of {}",
                entry.net, balance
            )));
        }
        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<LedgerEntry>> {
        Ok(lock(&self.entries)?.get(&id).cloned())
    }

    async fn decide_withdrawal(
        &self,
        id: Uuid,
        status: LedgerStatus,
        decided_by: Uuid,
    ) -> CoreResult<LedgerEntry> {
        let mut entries = lock(&self.entries)?;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| CoreError::NotFound(format!("ledger entry {}", id)))?;
        if entry.kind != LedgerKind::Withdrawal {
            return Err(CoreError::Validation(
                "only withdrawal entries can be decided".into(),
            ));
        }
        if entry.status != LedgerStatus::Pending {
            return Err(CoreError::Conflict("withdrawal already decided".into()));
        }
        entry.status = status;
        entry.decided_by = Some(decided_by);
        entry.decided_at = Some(Utc::now());
        Ok(entry.clone())
    }

    async fn entries_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<LedgerEntry>> {
        let entries = lock(&self.entries)?;
        Ok(Self::guide_entries(&entries, guide_id))
    }

    async fn list_pending_withdrawals(&self) -> CoreResult<Vec<LedgerEntry>> {
        Ok(lock(&self.entries)?
            .values()
            .filter(|e| e.kind == LedgerKind::Withdrawal && e.status == LedgerStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> CoreResult<Vec<LedgerEntry>> {
        Ok(lock(&self.entries)?.values().cloned().collect())
    }

    async fn available_balance(&self, guide_id: Uuid) -> CoreResult<Money> {
        let entries = lock(&self.entries)?;
        Ok(ledger::available_balance(&Self::guide_entries(
            &entries, guide_id,
        )))
    }
}
