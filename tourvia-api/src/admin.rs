use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tourvia_booking::ledger::{LedgerEntry, PlatformSummary};
use tourvia_booking::WithdrawalOutcome;
use tourvia_catalog::requests::{RequestOutcome, TourRequest};
use tourvia_core::identity::Actor;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RequestDecisionBody {
    outcome: RequestOutcome,
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WithdrawalDecisionBody {
    outcome: WithdrawalOutcome,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/requests", get(list_pending_requests))
        .route("/v1/admin/requests/{id}/decision", post(decide_request))
        .route("/v1/admin/requests/{id}/redrive", post(redrive_request))
        .route("/v1/admin/withdrawals", get(list_pending_withdrawals))
        .route(
            "/v1/admin/withdrawals/{id}/decision",
            post(decide_withdrawal),
        )
        .route("/v1/admin/finance/summary", get(finance_summary))
}

async fn list_pending_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<TourRequest>>, AppError> {
    Ok(Json(state.approvals.list_pending(actor).await?))
}

async fn decide_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<RequestDecisionBody>,
) -> Result<Json<TourRequest>, AppError> {
    let decided = state
        .approvals
        .decide(actor, id, body.outcome, body.notes)
        .await?;
    Ok(Json(decided))
}

/// Replays the side effects of an approved request whose tour update was
/// lost to a crash or a transient store failure.
async fn redrive_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.approvals.redrive_approval(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_pending_withdrawals(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    Ok(Json(state.settlement.list_pending_withdrawals(actor).await?))
}

async fn decide_withdrawal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<WithdrawalDecisionBody>,
) -> Result<Json<LedgerEntry>, AppError> {
    let decided = state
        .settlement
        .decide_withdrawal(actor, id, body.outcome)
        .await?;
    Ok(Json(decided))
}

async fn finance_summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<PlatformSummary>, AppError> {
    Ok(Json(state.settlement.platform_summary(actor).await?))
}
