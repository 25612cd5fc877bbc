use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tourvia_core::identity::{Actor, Role};
use tourvia_core::notify::Dispatcher;
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::{CommissionRate, Money, Notification, NotificationKind};
use uuid::Uuid;

use crate::ledger::{
    self, LedgerEntry, LedgerKind, LedgerStatus, MonthlyEarnings, PlatformSummary,
};
use crate::models::Booking;
use crate::repository::LedgerRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalOutcome {
    Approve,
    Reject,
}

/// Converts completed bookings into payout ledger entries and manages the
/// guide's balance and withdrawal requests against it.
#[derive(Clone)]
pub struct SettlementService {
    ledger: Arc<dyn LedgerRepository>,
    dispatcher: Dispatcher,
    min_withdrawal: Money,
}

impl SettlementService {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        dispatcher: Dispatcher,
        min_withdrawal: Money,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            min_withdrawal,
        }
    }

    /// Credit the guide's share of a completed booking. Exactly-once per
    /// booking: the ledger insert is conditional on no payout existing for
    /// this booking id, so a retry after a crash is a harmless no-op.
    pub async fn settle_booking(
        &self,
        booking: &Booking,
        rate: CommissionRate,
    ) -> CoreResult<Option<LedgerEntry>> {
        let split = rate.split(booking.paid_amount);
        let entry = LedgerEntry::payout(booking.id, booking.guide_id, split);

        if !self.ledger.insert_payout_once(&entry).await? {
            tracing::debug!(booking_id = %booking.id, "booking already settled, skipping");
            return Ok(None);
        }

        tracing::info!(
            booking_id = %booking.id,
            guide_id = %booking.guide_id,
            gross = %split.gross,
            fee = %split.fee,
            net = %split.net,
            "booking settled"
        );
        self.dispatcher
            .dispatch(Notification::to_user(
                booking.guide_id,
                NotificationKind::PayoutCredited,
                format!("{} credited for booking {}", split.net, booking.id),
            ))
            .await;
        Ok(Some(entry))
    }

    pub async fn available_balance(&self, guide_id: Uuid) -> CoreResult<Money> {
        self.ledger.available_balance(guide_id).await
    }

    /// Guide files a cash-out request. The balance check and the insert
    /// happen inside one atomic repository section.
    pub async fn request_withdrawal(&self, actor: Actor, amount: Money) -> CoreResult<LedgerEntry> {
        actor.require_role(Role::Guide)?;
        if amount < self.min_withdrawal {
            return Err(CoreError::Validation(format!(
                "withdrawal of {} is below the {} minimum",
                amount, self.min_withdrawal
            )));
        }

        let entry = LedgerEntry::withdrawal(actor.user_id, amount);
        self.ledger.insert_withdrawal_checked(&entry).await?;

        tracing::info!(entry_id = %entry.id, guide_id = %actor.user_id, %amount, "withdrawal requested");
        self.dispatcher
            .dispatch(Notification::to_admins(
                NotificationKind::WithdrawalRequested,
                format!("Guide {} requested a {} withdrawal", actor.user_id, amount),
            ))
            .await;
        Ok(entry)
    }

    /// Admin verdict on a pending withdrawal. Approval means the funds are
    /// considered disbursed externally; rejection returns the amount to the
    /// guide's available balance.
    pub async fn decide_withdrawal(
        &self,
        actor: Actor,
        entry_id: Uuid,
        outcome: WithdrawalOutcome,
    ) -> CoreResult<LedgerEntry> {
        actor.require_admin()?;
        let entry = self
            .ledger
            .get(entry_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("ledger entry {}", entry_id)))?;
        if entry.kind != LedgerKind::Withdrawal {
            return Err(CoreError::Validation(
                "only withdrawal entries can be decided".into(),
            ));
        }

        let status = match outcome {
            WithdrawalOutcome::Approve => LedgerStatus::Confirmed,
            WithdrawalOutcome::Reject => LedgerStatus::Rejected,
        };
        let decided = self
            .ledger
            .decide_withdrawal(entry_id, status, actor.user_id)
            .await?;

        tracing::info!(
            entry_id = %entry_id,
            admin_id = %actor.user_id,
            outcome = decided.status.as_str(),
            "withdrawal decided"
        );
        self.dispatcher
            .dispatch(Notification::to_user(
                decided.guide_id,
                NotificationKind::WithdrawalDecided,
                format!(
                    "Your withdrawal of {} was {}",
                    decided.net,
                    decided.status.as_str().to_lowercase()
                ),
            ))
            .await;
        Ok(decided)
    }

    /// Per-month earnings for a guide's dashboard. Pure projection over
    /// confirmed payouts; recomputed on every call.
    pub async fn monthly_statement(
        &self,
        guide_id: Uuid,
        year: i32,
    ) -> CoreResult<Vec<MonthlyEarnings>> {
        let entries = self.ledger.entries_for_guide(guide_id).await?;
        Ok(ledger::monthly_statement(&entries, year))
    }

    pub async fn entries_for_guide(&self, guide_id: Uuid) -> CoreResult<Vec<LedgerEntry>> {
        self.ledger.entries_for_guide(guide_id).await
    }

    pub async fn list_pending_withdrawals(&self, actor: Actor) -> CoreResult<Vec<LedgerEntry>> {
        actor.require_admin()?;
        self.ledger.list_pending_withdrawals().await
    }

    /// Gross/commission/guide-share totals for the admin dashboard.
    pub async fn platform_summary(&self, actor: Actor) -> CoreResult<PlatformSummary> {
        actor.require_admin()?;
        let entries = self.ledger.list_all().await?;
        Ok(ledger::platform_summary(&entries))
    }
}
