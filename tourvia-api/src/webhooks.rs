use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tourvia_booking::models::BookingStatus;
use tourvia_core::CoreError;
use tourvia_shared::Money;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Callback body from the payment gateway. Signature verification happens
/// at the edge proxy; by the time the request reaches this handler it is
/// trusted.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    pub booking_id: Uuid,
    pub session_id: String,
    pub event: String,
    pub amount_vnd: i64,
}

#[derive(Debug, Serialize)]
struct CallbackResponse {
    booking_id: Uuid,
    status: BookingStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_callback))
}

/// Gateways retry callbacks until acknowledged, so this handler must be
/// idempotent; a replay for an already-captured session returns 200.
async fn handle_payment_callback(
    State(state): State<AppState>,
    Json(payload): Json<PaymentCallback>,
) -> Result<Json<CallbackResponse>, AppError> {
    tracing::info!(
        booking_id = %payload.booking_id,
        session_id = %payload.session_id,
        event = %payload.event,
        "payment callback received"
    );

    if payload.event != "payment.succeeded" {
        return Err(CoreError::Validation(format!("unsupported event {}", payload.event)).into());
    }

    let amount = Money::new(payload.amount_vnd).map_err(CoreError::from)?;
    let booking = state
        .engine
        .capture_payment(payload.booking_id, &payload.session_id, amount)
        .await?;

    Ok(Json(CallbackResponse {
        booking_id: booking.id,
        status: booking.status,
    }))
}
