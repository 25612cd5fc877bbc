use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tourvia_catalog::Participant;
use tourvia_core::payment::PaymentSession;
use tourvia_shared::Money;
use uuid::Uuid;

/// Booking lifecycle status. Transitions are validated through
/// `can_transition_to` and nowhere else; every conditional write re-checks
/// the expected current status so racing writers cannot both land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    WaitingGuide,
    Accepted,
    Rejected,
    AwaitingPayment,
    Paid,
    Completed,
    Canceled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Completed | BookingStatus::Canceled
        )
    }

    /// The single transition table for the whole system.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (WaitingGuide, Accepted)
                | (WaitingGuide, Rejected)
                | (WaitingGuide, Canceled)
                | (Accepted, AwaitingPayment)
                | (Accepted, Canceled)
                | (AwaitingPayment, Paid)
                | (AwaitingPayment, Canceled)
                | (Paid, Completed)
                | (Paid, Canceled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::WaitingGuide => "WAITING_GUIDE",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::AwaitingPayment => "AWAITING_PAYMENT",
            BookingStatus::Paid => "PAID",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Canceled => "CANCELED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WAITING_GUIDE" => Some(BookingStatus::WaitingGuide),
            "ACCEPTED" => Some(BookingStatus::Accepted),
            "REJECTED" => Some(BookingStatus::Rejected),
            "AWAITING_PAYMENT" => Some(BookingStatus::AwaitingPayment),
            "PAID" => Some(BookingStatus::Paid),
            "COMPLETED" => Some(BookingStatus::Completed),
            "CANCELED" => Some(BookingStatus::Canceled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Pending,
    Accepted,
    Rejected,
}

/// The accept/reject verdict the intended guide issues on a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideDecision {
    pub status: DecisionStatus,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub note: Option<String>,
}

impl GuideDecision {
    pub fn pending() -> Self {
        Self {
            status: DecisionStatus::Pending,
            decided_at: None,
            decided_by: None,
            note: None,
        }
    }

    pub fn decided(status: DecisionStatus, decided_by: Uuid, note: Option<String>) -> Self {
        Self {
            status,
            decided_at: Some(Utc::now()),
            decided_by: Some(decided_by),
            note,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Accept,
    Reject,
}

/// A tourist's booking against a tour, naming an intended guide. Never
/// deleted; it only moves forward through the status machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub tour_id: Uuid,
    pub customer_id: Uuid,
    pub guide_id: Uuid,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub participants: Vec<Participant>,
    pub unit_price: Money,
    pub total_price: Money,
    pub status: BookingStatus,
    pub guide_decision: GuideDecision,
    pub payment: Option<PaymentSession>,
    pub paid_amount: Money,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tour_id: Uuid,
        customer_id: Uuid,
        guide_id: Uuid,
        start_date: NaiveDate,
        start_time: NaiveTime,
        participants: Vec<Participant>,
        unit_price: Money,
        total_price: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tour_id,
            customer_id,
            guide_id,
            start_date,
            start_time,
            participants,
            unit_price,
            total_price,
            status: BookingStatus::WaitingGuide,
            guide_decision: GuideDecision::pending(),
            payment: None,
            paid_amount: Money::ZERO,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a committed patch. Repositories call this inside their
    /// conditional-write section once the expected status has matched.
    pub fn apply(&mut self, patch: &BookingPatch) {
        self.status = patch.next;
        if let Some(decision) = &patch.decision {
            self.guide_decision = decision.clone();
        }
        if let Some(payment) = &patch.payment {
            self.payment = Some(payment.clone());
        }
        if let Some(paid) = patch.paid_amount {
            self.paid_amount = paid;
        }
        if let Some(reason) = &patch.cancel_reason {
            self.cancel_reason = Some(reason.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// One conditional state change: the target status plus whatever fields
/// move with it. Written atomically against an expected current status.
#[derive(Debug, Clone)]
pub struct BookingPatch {
    pub next: BookingStatus,
    pub decision: Option<GuideDecision>,
    pub payment: Option<PaymentSession>,
    pub paid_amount: Option<Money>,
    pub cancel_reason: Option<String>,
}

impl BookingPatch {
    pub fn to(next: BookingStatus) -> Self {
        Self {
            next,
            decision: None,
            payment: None,
            paid_amount: None,
            cancel_reason: None,
        }
    }

    pub fn with_decision(mut self, decision: GuideDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_payment(mut self, payment: PaymentSession) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_paid_amount(mut self, amount: Money) -> Self {
        self.paid_amount = Some(amount);
        self
    }

    pub fn with_cancel_reason(mut self, reason: impl Into<String>) -> Self {
        self.cancel_reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [
            WaitingGuide,
            Accepted,
            Rejected,
            AwaitingPayment,
            Paid,
            Completed,
            Canceled,
        ];
        for terminal in [Rejected, Completed, Canceled] {
            for next in all {
                assert!(
                    !terminal.can_transition_to(next),
                    "{:?} must not leave to {:?}",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn happy_path_is_permitted() {
        assert!(WaitingGuide.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(AwaitingPayment));
        assert!(AwaitingPayment.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Completed));
    }

    #[test]
    fn every_non_terminal_state_can_cancel() {
        for state in [WaitingGuide, Accepted, AwaitingPayment, Paid] {
            assert!(state.can_transition_to(Canceled));
        }
    }

    #[test]
    fn no_skipping_payment() {
        assert!(!WaitingGuide.can_transition_to(Paid));
        assert!(!Accepted.can_transition_to(Paid));
        assert!(!AwaitingPayment.can_transition_to(Completed));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for state in [
            WaitingGuide,
            Accepted,
            Rejected,
            AwaitingPayment,
            Paid,
            Completed,
            Canceled,
        ] {
            assert_eq!(BookingStatus::parse(state.as_str()), Some(state));
        }
    }
}
