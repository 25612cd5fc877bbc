use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tourvia_catalog::requests::{CreateTourPayload, TourRequest};
use tourvia_catalog::tour::{Tour, TourChanges};
use tourvia_core::identity::Actor;
use tourvia_core::{CoreError, CoreResult};
use tourvia_shared::Money;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateTourBody {
    name: String,
    description: String,
    price_vnd: i64,
    max_guests: u32,
    duration_days: u32,
    commission_fraction: Option<f64>,
}

impl CreateTourBody {
    fn into_payload(self) -> CoreResult<CreateTourPayload> {
        Ok(CreateTourPayload {
            name: self.name,
            description: self.description,
            price: Money::new(self.price_vnd)?,
            max_guests: self.max_guests,
            duration_days: self.duration_days,
            commission_fraction: self.commission_fraction,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EditRequestBody {
    description: String,
}

#[derive(Debug, Deserialize)]
struct DeleteRequestBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct TourChangesBody {
    name: Option<String>,
    description: Option<String>,
    price_vnd: Option<i64>,
    max_guests: Option<u32>,
}

impl TourChangesBody {
    fn into_changes(self) -> CoreResult<TourChanges> {
        Ok(TourChanges {
            name: self.name,
            description: self.description,
            price: self.price_vnd.map(Money::new).transpose()?,
            max_guests: self.max_guests,
        })
    }
}

/// Browsing needs no token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours", get(list_tours))
        .route("/v1/tours/{id}", get(get_tour))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours/requests", post(submit_tour_request).get(list_my_requests))
        .route("/v1/tours/requests/{id}", delete(cancel_request))
        .route("/v1/tours/{id}/edit-requests", post(submit_edit_request))
        .route("/v1/tours/{id}/delete-requests", post(submit_delete_request))
        .route("/v1/tours/{id}", patch(edit_tour))
}

async fn list_tours(State(state): State<AppState>) -> Result<Json<Vec<Tour>>, AppError> {
    Ok(Json(state.tours.list_active().await?))
}

async fn get_tour(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tour>, AppError> {
    let tour = state
        .tours
        .get(id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("tour {}", id)))?;
    Ok(Json(tour))
}

async fn submit_tour_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateTourBody>,
) -> Result<(StatusCode, Json<TourRequest>), AppError> {
    let payload = body.into_payload()?;
    let request = state.approvals.submit_tour_request(actor, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_my_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<TourRequest>>, AppError> {
    Ok(Json(state.approvals.list_for_guide(actor).await?))
}

async fn submit_edit_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(tour_id): Path<Uuid>,
    Json(body): Json<EditRequestBody>,
) -> Result<(StatusCode, Json<TourRequest>), AppError> {
    let request = state
        .approvals
        .submit_edit_request(actor, tour_id, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn submit_delete_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(tour_id): Path<Uuid>,
    Json(body): Json<DeleteRequestBody>,
) -> Result<(StatusCode, Json<TourRequest>), AppError> {
    let request = state
        .approvals
        .submit_delete_request(actor, tour_id, body.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn cancel_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.approvals.cancel_request(actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn edit_tour(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<TourChangesBody>,
) -> Result<Json<Tour>, AppError> {
    let changes = body.into_changes()?;
    Ok(Json(state.approvals.apply_tour_edit(actor, id, changes).await?))
}
