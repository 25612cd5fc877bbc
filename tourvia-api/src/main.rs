use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tourvia_api::{app, worker, AppState, AuthConfig};
use tourvia_booking::{BookingEngine, EngineRules, SettlementService};
use tourvia_catalog::{ApprovalRules, ApprovalService};
use tourvia_core::notify::{Dispatcher, TracingNotifier};
use tourvia_core::payment::MockPaymentGateway;
use tourvia_core::CoreError;
use tourvia_shared::Money;
use tourvia_store::pg::{
    PgBookingRepository, PgBusyCalendar, PgLedgerRepository, PgTourRepository,
    PgTourRequestRepository,
};
use tourvia_store::{Config, Database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tourvia_api=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("failed to load config")?;
    let rules = config.business_rules.clone();

    let db = Database::connect(&config.database.url)
        .await
        .context("failed to connect to postgres")?;
    db.migrate().await.context("failed to run migrations")?;

    let tours = Arc::new(PgTourRepository::new(db.pool.clone()));
    let requests = Arc::new(PgTourRequestRepository::new(db.pool.clone()));
    let bookings = Arc::new(PgBookingRepository::new(db.pool.clone()));
    let ledger = Arc::new(PgLedgerRepository::new(db.pool.clone()));
    let busy = Arc::new(PgBusyCalendar::new(db.pool.clone()));

    let dispatcher = Dispatcher::new(Arc::new(TracingNotifier));
    let min_withdrawal =
        Money::new(rules.min_withdrawal_vnd).map_err(CoreError::from)?;
    let settlement = SettlementService::new(ledger, dispatcher.clone(), min_withdrawal);
    let engine = Arc::new(BookingEngine::new(
        bookings.clone(),
        tours.clone(),
        busy.clone(),
        Arc::new(MockPaymentGateway),
        settlement.clone(),
        dispatcher.clone(),
        EngineRules {
            guide_decision_timeout_hours: rules.guide_decision_timeout_hours,
            payment_timeout_hours: rules.payment_timeout_hours,
        },
    ));
    let approvals = Arc::new(ApprovalService::new(
        tours.clone(),
        requests,
        bookings,
        dispatcher,
        ApprovalRules {
            max_tour_duration_days: rules.max_tour_duration_days,
            edit_window_hours: rules.edit_window_hours,
            default_commission_bps: rules.default_commission_bps,
        },
    ));

    worker::spawn_sweeper(engine.clone(), rules.sweep_interval_seconds);

    let state = AppState {
        engine,
        approvals,
        settlement,
        tours,
        busy,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules: rules,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app(state))
        .await
        .context("server exited")?;
    Ok(())
}
