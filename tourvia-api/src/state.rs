use std::sync::Arc;

use tourvia_booking::{BookingEngine, SettlementService};
use tourvia_catalog::repository::{BusyCalendar, TourRepository};
use tourvia_catalog::ApprovalService;
use tourvia_store::BusinessRules;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub approvals: Arc<ApprovalService>,
    pub settlement: SettlementService,
    pub tours: Arc<dyn TourRepository>,
    pub busy: Arc<dyn BusyCalendar>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}
