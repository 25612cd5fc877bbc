use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tourvia_shared::{CommissionSplit, Money};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    Payout,
    Withdrawal,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Payout => "PAYOUT",
            LedgerKind::Withdrawal => "WITHDRAWAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PAYOUT" => Some(LedgerKind::Payout),
            "WITHDRAWAL" => Some(LedgerKind::Withdrawal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "PENDING",
            LedgerStatus::Confirmed => "CONFIRMED",
            LedgerStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(LedgerStatus::Pending),
            "CONFIRMED" => Some(LedgerStatus::Confirmed),
            "REJECTED" => Some(LedgerStatus::Rejected),
            _ => None,
        }
    }
}

/// One immutable row of the settlement ledger. `gross == fee + net` holds
/// exactly for every entry; once CONFIRMED a row never changes again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// Set for payouts (the settled booking); None for withdrawals.
    pub booking_id: Option<Uuid>,
    pub guide_id: Uuid,
    pub gross: Money,
    pub fee: Money,
    pub net: Money,
    pub kind: LedgerKind,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
}

impl LedgerEntry {
    /// Settlement of a completed booking: confirmed immediately, the
    /// booking id is the idempotency key.
    pub fn payout(booking_id: Uuid, guide_id: Uuid, split: CommissionSplit) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: Some(booking_id),
            guide_id,
            gross: split.gross,
            fee: split.fee,
            net: split.net,
            kind: LedgerKind::Payout,
            status: LedgerStatus::Confirmed,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        }
    }

    /// A guide's cash-out request, pending until an admin decides.
    pub fn withdrawal(guide_id: Uuid, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: None,
            guide_id,
            gross: amount,
            fee: Money::ZERO,
            net: amount,
            kind: LedgerKind::Withdrawal,
            status: LedgerStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        }
    }
}

/// Confirmed payouts minus pending and confirmed withdrawals. Rejected
/// withdrawals fall out of the sum, returning the amount to the balance.
pub fn available_balance(entries: &[LedgerEntry]) -> Money {
    let credited: Money = entries
        .iter()
        .filter(|e| e.kind == LedgerKind::Payout && e.status == LedgerStatus::Confirmed)
        .map(|e| e.net)
        .sum();
    let withdrawn: Money = entries
        .iter()
        .filter(|e| {
            e.kind == LedgerKind::Withdrawal
                && matches!(e.status, LedgerStatus::Pending | LedgerStatus::Confirmed)
        })
        .map(|e| e.net)
        .sum();
    credited.saturating_sub(withdrawn)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlyEarnings {
    pub year: i32,
    pub month: u32,
    pub gross: Money,
    pub fees: Money,
    pub net: Money,
    pub bookings: u32,
}

/// Calendar-month projection over confirmed payouts. Pure: recomputable
/// at any time, so it can never drift from the ledger.
pub fn monthly_statement(entries: &[LedgerEntry], year: i32) -> Vec<MonthlyEarnings> {
    let mut months: Vec<MonthlyEarnings> = (1..=12)
        .map(|month| MonthlyEarnings {
            year,
            month,
            gross: Money::ZERO,
            fees: Money::ZERO,
            net: Money::ZERO,
            bookings: 0,
        })
        .collect();

    for entry in entries {
        if entry.kind != LedgerKind::Payout || entry.status != LedgerStatus::Confirmed {
            continue;
        }
        if entry.created_at.year() != year {
            continue;
        }
        let slot = &mut months[(entry.created_at.month() - 1) as usize];
        slot.gross = slot.gross.checked_add(entry.gross).unwrap_or(slot.gross);
        slot.fees = slot.fees.checked_add(entry.fee).unwrap_or(slot.fees);
        slot.net = slot.net.checked_add(entry.net).unwrap_or(slot.net);
        slot.bookings += 1;
    }
    months
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformSummary {
    pub gross_revenue: Money,
    pub commission_earned: Money,
    pub guide_share: Money,
    pub settled_bookings: u32,
    pub pending_withdrawals: u32,
    pub pending_withdrawal_amount: Money,
}

/// Admin dashboard aggregate, derived entirely from the ledger.
pub fn platform_summary(entries: &[LedgerEntry]) -> PlatformSummary {
    let mut summary = PlatformSummary {
        gross_revenue: Money::ZERO,
        commission_earned: Money::ZERO,
        guide_share: Money::ZERO,
        settled_bookings: 0,
        pending_withdrawals: 0,
        pending_withdrawal_amount: Money::ZERO,
    };
    for entry in entries {
        match entry.kind {
            LedgerKind::Payout if entry.status == LedgerStatus::Confirmed => {
                summary.gross_revenue = summary
                    .gross_revenue
                    .checked_add(entry.gross)
                    .unwrap_or(summary.gross_revenue);
                summary.commission_earned = summary
                    .commission_earned
                    .checked_add(entry.fee)
                    .unwrap_or(summary.commission_earned);
                summary.guide_share = summary
                    .guide_share
                    .checked_add(entry.net)
                    .unwrap_or(summary.guide_share);
                summary.settled_bookings += 1;
            }
            LedgerKind::Withdrawal if entry.status == LedgerStatus::Pending => {
                summary.pending_withdrawals += 1;
                summary.pending_withdrawal_amount = summary
                    .pending_withdrawal_amount
                    .checked_add(entry.net)
                    .unwrap_or(summary.pending_withdrawal_amount);
            }
            _ => {}
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourvia_shared::CommissionRate;

    fn vnd(units: i64) -> Money {
        Money::new(units).unwrap()
    }

    fn payout(guide: Uuid, gross: i64) -> LedgerEntry {
        let rate = CommissionRate::from_bps(1500).unwrap();
        LedgerEntry::payout(Uuid::new_v4(), guide, rate.split(vnd(gross)))
    }

    #[test]
    fn payout_entries_balance_exactly() {
        let entry = payout(Uuid::new_v4(), 1_000_000);
        assert_eq!(entry.fee.checked_add(entry.net).unwrap(), entry.gross);
        assert_eq!(entry.fee, vnd(150_000));
        assert_eq!(entry.net, vnd(850_000));
    }

    #[test]
    fn pending_withdrawals_reduce_the_balance() {
        let guide = Uuid::new_v4();
        let mut entries = vec![payout(guide, 1_000_000)];
        assert_eq!(available_balance(&entries), vnd(850_000));

        entries.push(LedgerEntry::withdrawal(guide, vnd(500_000)));
        assert_eq!(available_balance(&entries), vnd(350_000));
    }

    #[test]
    fn rejected_withdrawals_return_to_the_balance() {
        let guide = Uuid::new_v4();
        let mut withdrawal = LedgerEntry::withdrawal(guide, vnd(500_000));
        withdrawal.status = LedgerStatus::Rejected;
        let entries = vec![payout(guide, 1_000_000), withdrawal];
        assert_eq!(available_balance(&entries), vnd(850_000));
    }

    #[test]
    fn monthly_statement_matches_the_ledger_sums() {
        let guide = Uuid::new_v4();
        let entries = vec![payout(guide, 1_000_000), payout(guide, 333)];
        let year = Utc::now().year();
        let statement = monthly_statement(&entries, year);

        let total_net: Money = statement.iter().map(|m| m.net).sum();
        let ledger_net: Money = entries.iter().map(|e| e.net).sum();
        assert_eq!(total_net, ledger_net);

        let total_bookings: u32 = statement.iter().map(|m| m.bookings).sum();
        assert_eq!(total_bookings, 2);
    }

    #[test]
    fn platform_summary_tracks_pending_withdrawals() {
        let guide = Uuid::new_v4();
        let entries = vec![
            payout(guide, 1_000_000),
            LedgerEntry::withdrawal(guide, vnd(200_000)),
        ];
        let summary = platform_summary(&entries);
        assert_eq!(summary.gross_revenue, vnd(1_000_000));
        assert_eq!(summary.commission_earned, vnd(150_000));
        assert_eq!(summary.pending_withdrawals, 1);
        assert_eq!(summary.pending_withdrawal_amount, vnd(200_000));
    }
}
