use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse},
        services::{login, validate_user},
    },
    error::{ApiJson, AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login_handler))
}

#[instrument(skip(state, payload))]
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        warn!("login with empty email or password");
        return Err(AppError::validation("Email and password are required"));
    }

    let user = validate_user(state.users.as_ref(), email, &payload.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let response = login(&state.keys, user)?;
    info!(user_id = %response.user.id, "user logged in");
    Ok(Json(response))
}
