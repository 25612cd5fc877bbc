pub mod engine;
pub mod ledger;
pub mod models;
pub mod repository;
pub mod settlement;

pub use engine::{BookingDraft, BookingEngine, EngineRules};
pub use ledger::{LedgerEntry, LedgerKind, LedgerStatus, MonthlyEarnings, PlatformSummary};
pub use models::{
    Booking, BookingPatch, BookingStatus, DecisionOutcome, DecisionStatus, GuideDecision,
};
pub use settlement::{SettlementService, WithdrawalOutcome};
