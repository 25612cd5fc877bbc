use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use tourvia_booking::ledger::{LedgerEntry, MonthlyEarnings};
use tourvia_core::identity::{Actor, Role};
use tourvia_core::CoreError;
use tourvia_shared::Money;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct BalanceResponse {
    balance: Money,
}

#[derive(Debug, Deserialize)]
struct StatementQuery {
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct WithdrawalRequestBody {
    amount_vnd: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/finance/balance", get(get_balance))
        .route("/v1/finance/statement", get(get_statement))
        .route("/v1/finance/ledger", get(get_ledger))
        .route("/v1/finance/withdrawals", post(request_withdrawal))
}

async fn get_balance(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<BalanceResponse>, AppError> {
    actor.require_role(Role::Guide)?;
    let balance = state.settlement.available_balance(actor.user_id).await?;
    Ok(Json(BalanceResponse { balance }))
}

async fn get_statement(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<StatementQuery>,
) -> Result<Json<Vec<MonthlyEarnings>>, AppError> {
    actor.require_role(Role::Guide)?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let statement = state
        .settlement
        .monthly_statement(actor.user_id, year)
        .await?;
    Ok(Json(statement))
}

async fn get_ledger(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    actor.require_role(Role::Guide)?;
    Ok(Json(state.settlement.entries_for_guide(actor.user_id).await?))
}

async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<WithdrawalRequestBody>,
) -> Result<(StatusCode, Json<LedgerEntry>), AppError> {
    let amount = Money::new(body.amount_vnd).map_err(CoreError::from)?;
    let entry = state.settlement.request_withdrawal(actor, amount).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
