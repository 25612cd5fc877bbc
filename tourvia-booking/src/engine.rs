use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tourvia_catalog::pricing;
use tourvia_catalog::repository::{BusyCalendar, TourRepository};
use tourvia_catalog::Participant;
use tourvia_core::identity::{Actor, Role};
use tourvia_core::notify::Dispatcher;
use tourvia_core::payment::{PaymentGateway, PaymentSessionStatus};
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::{Money, Notification, NotificationKind};
use uuid::Uuid;

use crate::models::{
    Booking, BookingPatch, BookingStatus, DecisionOutcome, DecisionStatus, GuideDecision,
};
use crate::repository::BookingRepository;
use crate::settlement::SettlementService;

#[derive(Debug, Clone)]
pub struct EngineRules {
    pub guide_decision_timeout_hours: i64,
    pub payment_timeout_hours: i64,
}

/// What a tourist submits to open a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub tour_id: Uuid,
    pub guide_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub participants: Vec<Participant>,
}

/// The booking state machine. All writes go through conditional updates
/// keyed on the expected current status, so concurrent actors (a guide
/// accepting while the tourist cancels, two admins, webhook replays) are
/// serialized by the store, not by an application lock.
pub struct BookingEngine {
    bookings: Arc<dyn BookingRepository>,
    tours: Arc<dyn TourRepository>,
    busy: Arc<dyn BusyCalendar>,
    gateway: Arc<dyn PaymentGateway>,
    settlement: SettlementService,
    dispatcher: Dispatcher,
    rules: EngineRules,
}

impl BookingEngine {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        tours: Arc<dyn TourRepository>,
        busy: Arc<dyn BusyCalendar>,
        gateway: Arc<dyn PaymentGateway>,
        settlement: SettlementService,
        dispatcher: Dispatcher,
        rules: EngineRules,
    ) -> Self {
        Self {
            bookings,
            tours,
            busy,
            gateway,
            settlement,
            dispatcher,
            rules,
        }
    }

    /// Tourist opens a booking against a tour, naming an intended guide.
    pub async fn create(&self, actor: Actor, draft: BookingDraft) -> CoreResult<Booking> {
        actor.require_role(Role::Customer)?;
        if draft.start_date < Utc::now().date_naive() {
            return Err(CoreError::Validation("start date is in the past".into()));
        }

        let tour = self
            .tours
            .get(draft.tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", draft.tour_id)))?;
        if !tour.is_bookable() {
            return Err(CoreError::Unavailable(
                "tour is not currently accepting bookings".into(),
            ));
        }
        if !tour.has_guide(draft.guide_id) {
            return Err(CoreError::Validation(
                "the named guide is not assigned to this tour".into(),
            ));
        }
        if self.busy.is_busy(draft.guide_id, draft.start_date).await? {
            return Err(CoreError::Unavailable(format!(
                "guide is not available on {}",
                draft.start_date
            )));
        }

        let total = pricing::quote(tour.price, tour.max_guests, &draft.participants)?;
        let booking = Booking::new(
            draft.tour_id,
            actor.user_id,
            draft.guide_id,
            draft.start_date,
            draft.start_time,
            draft.participants,
            tour.price,
            total,
        );
        self.bookings.insert(&booking).await?;

        tracing::info!(
            booking_id = %booking.id,
            tour_id = %booking.tour_id,
            customer_id = %actor.user_id,
            total = %total,
            "booking created"
        );
        self.dispatcher
            .dispatch(Notification::to_user(
                booking.guide_id,
                NotificationKind::BookingRequested,
                format!("New booking request {} for {}", booking.id, tour.name),
            ))
            .await;
        Ok(booking)
    }

    pub async fn get(&self, actor: Actor, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.fetch(booking_id).await?;
        if !actor.is_admin()
            && booking.customer_id != actor.user_id
            && booking.guide_id != actor.user_id
        {
            return Err(CoreError::Permission("not a party to this booking".into()));
        }
        Ok(booking)
    }

    /// Guide verdict on a waiting booking. Single-writer: the conditional
    /// write is keyed on WAITING_GUIDE, so of two racing decisions (or a
    /// decision racing a cancellation) exactly one lands and the loser
    /// gets `Conflict`.
    pub async fn decide(
        &self,
        actor: Actor,
        booking_id: Uuid,
        outcome: DecisionOutcome,
        note: Option<String>,
    ) -> CoreResult<Booking> {
        let booking = self.fetch(booking_id).await?;
        if !actor.is_admin() && !(actor.role == Role::Guide && booking.guide_id == actor.user_id) {
            return Err(CoreError::Permission(
                "only the intended guide may decide this booking".into(),
            ));
        }

        let booking = match outcome {
            DecisionOutcome::Reject => {
                let decision =
                    GuideDecision::decided(DecisionStatus::Rejected, actor.user_id, note);
                let updated = self
                    .bookings
                    .update_if_status(
                        booking_id,
                        BookingStatus::WaitingGuide,
                        BookingPatch::to(BookingStatus::Rejected).with_decision(decision),
                    )
                    .await
                    .map_err(already_decided)?;
                self.dispatcher
                    .dispatch(Notification::to_user(
                        updated.customer_id,
                        NotificationKind::BookingRejected,
                        format!("Your booking {} was declined by the guide", booking_id),
                    ))
                    .await;
                updated
            }
            DecisionOutcome::Accept => {
                let decision =
                    GuideDecision::decided(DecisionStatus::Accepted, actor.user_id, note);
                // The WAITING_GUIDE → ACCEPTED swap is the single-writer
                // gate; opening the payment session happens after it and is
                // retryable if the process dies in between.
                self.bookings
                    .update_if_status(
                        booking_id,
                        BookingStatus::WaitingGuide,
                        BookingPatch::to(BookingStatus::Accepted).with_decision(decision),
                    )
                    .await
                    .map_err(already_decided)?;
                let updated = self.open_payment(booking_id).await?;
                self.dispatcher
                    .dispatch(Notification::to_user(
                        updated.customer_id,
                        NotificationKind::BookingAccepted,
                        format!(
                            "Your booking {} was accepted; {} is due",
                            booking_id, updated.total_price
                        ),
                    ))
                    .await;
                updated
            }
        };

        tracing::info!(
            %booking_id,
            decided_by = %actor.user_id,
            status = booking.status.as_str(),
            "guide decision recorded"
        );
        Ok(booking)
    }

    /// Open a checkout session for an accepted booking and advance it to
    /// AWAITING_PAYMENT. Safe to call again if a previous attempt failed
    /// after the acceptance landed.
    pub async fn open_payment(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.fetch(booking_id).await?;
        if booking.status != BookingStatus::Accepted {
            return Err(CoreError::Conflict(format!(
                "booking is {}, not ACCEPTED",
                booking.status.as_str()
            )));
        }
        let session = self
            .gateway
            .open_session(booking_id, booking.total_price)
            .await?;
        self.bookings
            .update_if_status(
                booking_id,
                BookingStatus::Accepted,
                BookingPatch::to(BookingStatus::AwaitingPayment).with_payment(session),
            )
            .await
    }

    /// Payment capture callback. Idempotent by session id: a replay of the
    /// same gateway callback after the booking is PAID is acknowledged
    /// without crediting twice.
    pub async fn capture_payment(
        &self,
        booking_id: Uuid,
        session_id: &str,
        amount: Money,
    ) -> CoreResult<Booking> {
        let booking = self.fetch(booking_id).await?;

        let known_session = booking
            .payment
            .as_ref()
            .map(|p| p.session_id == session_id)
            .unwrap_or(false);
        if booking.status == BookingStatus::Paid && known_session {
            tracing::debug!(%booking_id, session_id, "duplicate capture callback ignored");
            return Ok(booking);
        }
        if booking.status != BookingStatus::AwaitingPayment {
            return Err(CoreError::Conflict(format!(
                "booking is {}, not AWAITING_PAYMENT",
                booking.status.as_str()
            )));
        }
        if !known_session {
            return Err(CoreError::Conflict(format!(
                "unknown payment session {} for booking {}",
                session_id, booking_id
            )));
        }
        if amount != booking.total_price {
            return Err(CoreError::Validation(format!(
                "captured amount {} does not match the {} due",
                amount, booking.total_price
            )));
        }

        let mut session = booking
            .payment
            .clone()
            .ok_or_else(|| CoreError::Internal("session vanished after check".into()))?;
        session.status = PaymentSessionStatus::Succeeded;
        let updated = self
            .bookings
            .update_if_status(
                booking_id,
                BookingStatus::AwaitingPayment,
                BookingPatch::to(BookingStatus::Paid)
                    .with_paid_amount(amount)
                    .with_payment(session),
            )
            .await?;

        tracing::info!(%booking_id, %amount, "payment captured");
        self.dispatcher
            .dispatch(Notification::to_user(
                updated.guide_id,
                NotificationKind::PaymentReceived,
                format!("Booking {} is paid ({})", booking_id, amount),
            ))
            .await;
        Ok(updated)
    }

    /// Mark a paid booking completed and settle the guide's share. The
    /// settlement insert is idempotent on the booking id, so a retry after
    /// a crash between the two writes cannot double-credit.
    pub async fn complete(&self, actor: Actor, booking_id: Uuid) -> CoreResult<Booking> {
        let booking = self.fetch(booking_id).await?;
        if !actor.is_admin() && !(actor.role == Role::Guide && booking.guide_id == actor.user_id) {
            return Err(CoreError::Permission(
                "only the assigned guide may complete this booking".into(),
            ));
        }
        if !actor.is_admin() && booking.start_date >= Utc::now().date_naive() {
            return Err(CoreError::Conflict(
                "the tour date has not passed yet".into(),
            ));
        }

        // Resolve the commission before committing: if the assignment is
        // gone we fail closed instead of completing an unsettleable booking.
        let tour = self
            .tours
            .get(booking.tour_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("tour {}", booking.tour_id)))?;
        let rate = tour.commission_for(booking.guide_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "guide {} has no commission on tour {}",
                booking.guide_id, booking.tour_id
            ))
        })?;

        let updated = self
            .bookings
            .update_if_status(
                booking_id,
                BookingStatus::Paid,
                BookingPatch::to(BookingStatus::Completed),
            )
            .await?;
        self.settlement.settle_booking(&updated, rate).await?;

        tracing::info!(%booking_id, "booking completed");
        self.dispatcher
            .dispatch(Notification::to_user(
                updated.customer_id,
                NotificationKind::BookingCompleted,
                format!("Booking {} is complete. Thanks for traveling!", booking_id),
            ))
            .await;
        Ok(updated)
    }

    /// Cancel from any non-terminal state. For a PAID booking the refund is
    /// issued after the transition commits; a refund transport failure
    /// surfaces to the caller (the cancellation itself stands and the
    /// refund call can be retried).
    pub async fn cancel(
        &self,
        actor: Actor,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> CoreResult<Booking> {
        let booking = self.fetch(booking_id).await?;
        let is_party = booking.customer_id == actor.user_id || booking.guide_id == actor.user_id;
        if !actor.is_admin() && !is_party {
            return Err(CoreError::Permission("not a party to this booking".into()));
        }
        if booking.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "booking is already {}",
                booking.status.as_str()
            )));
        }

        let was_paid = booking.status == BookingStatus::Paid;
        let reason = reason.unwrap_or_else(|| "canceled by request".to_string());
        // Expected status re-checked atomically: if the guide accepted in
        // the meantime, this loses with Conflict and the caller re-fetches.
        let updated = self
            .bookings
            .update_if_status(
                booking_id,
                booking.status,
                BookingPatch::to(BookingStatus::Canceled).with_cancel_reason(reason),
            )
            .await?;

        tracing::info!(%booking_id, canceled_by = %actor.user_id, "booking canceled");
        self.dispatcher
            .dispatch(Notification::to_user(
                if actor.user_id == updated.customer_id {
                    updated.guide_id
                } else {
                    updated.customer_id
                },
                NotificationKind::BookingCanceled,
                format!("Booking {} was canceled", booking_id),
            ))
            .await;

        if was_paid {
            let session = updated
                .payment
                .as_ref()
                .ok_or_else(|| CoreError::Internal("paid booking without session".into()))?;
            self.gateway
                .refund(&session.session_id, updated.paid_amount)
                .await?;
            tracing::info!(%booking_id, amount = %updated.paid_amount, "refund issued");
        }
        Ok(updated)
    }

    /// Timeout sweep: cancel bookings stuck waiting on a guide decision or
    /// on payment. Each window runs from the booking's last transition, so
    /// time spent waiting on the guide never eats into the payment window.
    /// Losing a race against a concurrent transition is fine, the booking
    /// simply moved on.
    pub async fn sweep_stale(&self, now: DateTime<Utc>) -> CoreResult<u32> {
        let mut swept = 0;
        let sweeps = [
            (
                BookingStatus::WaitingGuide,
                now - Duration::hours(self.rules.guide_decision_timeout_hours),
                "guide decision timed out",
            ),
            (
                BookingStatus::AwaitingPayment,
                now - Duration::hours(self.rules.payment_timeout_hours),
                "payment timed out",
            ),
        ];
        for (status, cutoff, reason) in sweeps {
            for booking in self.bookings.list_stale(status, cutoff).await? {
                match self
                    .bookings
                    .update_if_status(
                        booking.id,
                        status,
                        BookingPatch::to(BookingStatus::Canceled).with_cancel_reason(reason),
                    )
                    .await
                {
                    Ok(_) => {
                        swept += 1;
                        tracing::info!(booking_id = %booking.id, reason, "stale booking canceled");
                    }
                    Err(CoreError::Conflict(_)) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(swept)
    }

    pub async fn list_for_customer(&self, actor: Actor) -> CoreResult<Vec<Booking>> {
        self.bookings.list_for_customer(actor.user_id).await
    }

    pub async fn list_for_guide(&self, actor: Actor) -> CoreResult<Vec<Booking>> {
        self.bookings.list_for_guide(actor.user_id).await
    }

    async fn fetch(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("booking {}", booking_id)))
    }
}

/// A failed decision CAS means someone else got there first.
fn already_decided(err: CoreError) -> CoreError {
    match err {
        CoreError::Conflict(_) => CoreError::Conflict("booking already decided".into()),
        other => other,
    }
}
