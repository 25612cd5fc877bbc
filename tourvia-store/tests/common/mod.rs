use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use tourvia_booking::{BookingDraft, BookingEngine, EngineRules, SettlementService};
use tourvia_catalog::tour::{GuideAssignment, GuideRole, Tour};
use tourvia_catalog::{ApprovalRules, ApprovalService, Participant};
use tourvia_core::identity::{Actor, Role};
use tourvia_core::notify::{Dispatcher, TracingNotifier};
use tourvia_core::payment::{MockPaymentGateway, PaymentGateway};
use tourvia_shared::{CommissionRate, Money};
use tourvia_store::memory::{
    InMemoryBookingRepository, InMemoryBusyCalendar, InMemoryLedgerRepository,
    InMemoryTourRepository, InMemoryTourRequestRepository,
};
use uuid::Uuid;

pub struct Harness {
    pub engine: Arc<BookingEngine>,
    pub approvals: Arc<ApprovalService>,
    pub settlement: SettlementService,
    pub tours: Arc<InMemoryTourRepository>,
    pub requests: Arc<InMemoryTourRequestRepository>,
    pub bookings: Arc<InMemoryBookingRepository>,
    pub busy: Arc<InMemoryBusyCalendar>,
    pub customer: Actor,
    pub guide: Actor,
    pub admin: Actor,
}

pub fn vnd(units: i64) -> Money {
    Money::new(units).unwrap()
}

pub fn harness() -> Harness {
    harness_with_gateway(Arc::new(MockPaymentGateway))
}

pub fn harness_with_gateway(gateway: Arc<dyn PaymentGateway>) -> Harness {
    let tours = Arc::new(InMemoryTourRepository::new());
    let requests = Arc::new(InMemoryTourRequestRepository::new());
    let bookings = Arc::new(InMemoryBookingRepository::new());
    let ledger = Arc::new(InMemoryLedgerRepository::new());
    let busy = Arc::new(InMemoryBusyCalendar::new());
    let dispatcher = Dispatcher::new(Arc::new(TracingNotifier));

    let settlement = SettlementService::new(ledger, dispatcher.clone(), vnd(100_000));
    let engine = Arc::new(BookingEngine::new(
        bookings.clone(),
        tours.clone(),
        busy.clone(),
        gateway,
        settlement.clone(),
        dispatcher.clone(),
        EngineRules {
            guide_decision_timeout_hours: 48,
            payment_timeout_hours: 24,
        },
    ));
    let approvals = Arc::new(ApprovalService::new(
        tours.clone(),
        requests.clone(),
        bookings.clone(),
        dispatcher,
        ApprovalRules {
            max_tour_duration_days: 30,
            edit_window_hours: 48,
            default_commission_bps: 1500,
        },
    ));

    Harness {
        engine,
        approvals,
        settlement,
        tours,
        requests,
        bookings,
        busy,
        customer: Actor::new(Uuid::new_v4(), Role::Customer),
        guide: Actor::new(Uuid::new_v4(), Role::Guide),
        admin: Actor::new(Uuid::new_v4(), Role::Admin),
    }
}

impl Harness {
    /// Publish a 500,000đ / 15% tour led by `self.guide`.
    pub async fn seed_tour(&self) -> Tour {
        let tour = Tour::new(
            "Mekong delta day trip".into(),
            "Boat, bikes, and a floating market".into(),
            vnd(500_000),
            10,
            1,
            GuideAssignment {
                guide_id: self.guide.user_id,
                commission: CommissionRate::from_bps(1500).unwrap(),
                role: GuideRole::Lead,
            },
        );
        use tourvia_catalog::repository::TourRepository;
        self.tours.insert(&tour).await.unwrap();
        tour
    }

    pub fn draft(&self, tour: &Tour, participants: Vec<Participant>) -> BookingDraft {
        BookingDraft {
            tour_id: tour.id,
            guide_id: self.guide.user_id,
            start_date: (Utc::now() + Duration::days(7)).date_naive(),
            start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            participants,
        }
    }
}

pub fn adult(name: &str) -> Participant {
    Participant {
        full_name: name.into(),
        age: 30,
        count_slot: true,
    }
}

pub fn child(name: &str, age: u32) -> Participant {
    Participant {
        full_name: name.into(),
        age,
        count_slot: true,
    }
}

pub fn infant(name: &str) -> Participant {
    Participant {
        full_name: name.into(),
        age: 1,
        count_slot: false,
    }
}
