use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tourvia_core::identity::Role;
use tourvia_core::CoreError;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::issue_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct TokenRequest {
    user_id: Option<Uuid>,
    role: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/token", post(issue_dev_token))
}

/// Development login: mints a token for any role without credentials.
/// The real identity provider sits in front of this service in
/// production and this route is not exposed there.
async fn issue_dev_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let role = Role::parse(&req.role)?;
    let user_id = req.user_id.unwrap_or_else(Uuid::new_v4);

    let token = issue_token(&state.auth.secret, user_id, role, state.auth.expiration)
        .map_err(|e| CoreError::Internal(format!("token encoding failed: {}", e)))?;

    Ok(Json(TokenResponse { token, user_id }))
}
