use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use tourvia_core::identity::{Actor, Role};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/guides/busy-dates", get(list_busy_dates))
        .route(
            "/v1/guides/busy-dates/{date}",
            put(mark_busy).delete(clear_busy),
        )
}

fn guide_id(actor: Actor) -> Result<Uuid, AppError> {
    actor.require_role(Role::Guide)?;
    Ok(actor.user_id)
}

async fn list_busy_dates(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<NaiveDate>>, AppError> {
    let guide = guide_id(actor)?;
    Ok(Json(state.busy.list(guide).await?))
}

/// Set semantics: marking an already-busy day succeeds unchanged.
async fn mark_busy(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, AppError> {
    let guide = guide_id(actor)?;
    state.busy.mark(guide, date).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_busy(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, AppError> {
    let guide = guide_id(actor)?;
    state.busy.clear(guide, date).await?;
    Ok(StatusCode::NO_CONTENT)
}
