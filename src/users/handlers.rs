use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        CreateFavoriteRequest, CreateReviewRequest, CreateUserRequest, MessageResponse,
        Pagination, RecipeSummary, UpdateNameRequest, UpdatePasswordRequest,
    },
    services,
};
use crate::{
    auth::{require_auth, AuthUser},
    error::{ApiJson, ApiPath, ApiQuery, AppError, AppResult},
    state::AppState,
};

// --- public routers ---

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/user", post(create_user))
}

/// Every route here runs behind [`require_auth`].
pub fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/user/:id/name", patch(update_name))
        .route("/user/:id/password", patch(update_password))
        .route("/user/:id/favorites", patch(add_favorite).get(list_favorites))
        .route(
            "/user/:id/favorites/:recipe_id",
            delete(remove_favorite).post(add_review_to_favorites_recipe),
        )
        .route("/user/:id/:recipe_id/reviews", post(add_review))
        .route("/user/:id/reviews", get(list_reviews))
        .route("/user/:id/deactivate", patch(deactivate))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn message(message: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { message })
}

// --- handlers ---

#[instrument(skip(state, body))]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    services::create_user(state.users.as_ref(), body).await?;
    Ok((StatusCode::CREATED, message("User created successfully")))
}

#[instrument(skip(state, auth, body))]
pub async fn update_name(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdateNameRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::update_name(state.users.as_ref(), id, &body.name).await?;
    Ok(message("Name updated successfully"))
}

#[instrument(skip(state, auth, body))]
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::update_password(state.users.as_ref(), id, &body.password).await?;
    Ok(message("Password updated successfully"))
}

#[instrument(skip(state, auth, body))]
pub async fn add_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateFavoriteRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::add_favorite(state.users.as_ref(), id, body).await?;
    Ok(message("Recipe added to favorites"))
}

#[instrument(skip(state, auth))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, recipe_id)): ApiPath<(Uuid, String)>,
) -> AppResult<Json<MessageResponse>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::remove_favorite(state.users.as_ref(), id, &recipe_id).await?;
    Ok(message("Recipe removed from favorites"))
}

#[instrument(skip(state, auth, body))]
pub async fn add_review(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, recipe_id)): ApiPath<(Uuid, String)>,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> AppResult<Json<MessageResponse>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::add_review(state.users.as_ref(), id, &recipe_id, body).await?;
    Ok(message("Review added or updated"))
}

/// `POST /user/:id/favorites/reviews` lands on the favorites route because
/// its static segment wins over `:recipe_id`. Only the `reviews` suffix is a
/// real route here; it reviews the recipe whose id is `favorites`.
#[instrument(skip(state, auth, body))]
pub async fn add_review_to_favorites_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath((id, suffix)): ApiPath<(Uuid, String)>,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> AppResult<Json<MessageResponse>> {
    if suffix != "reviews" {
        return Err(AppError::MethodNotAllowed);
    }
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::add_review(state.users.as_ref(), id, "favorites", body).await?;
    Ok(message("Review added or updated"))
}

#[instrument(skip(state, auth))]
pub async fn list_favorites(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(p): ApiQuery<Pagination>,
) -> AppResult<Json<Vec<RecipeSummary>>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    let items = services::list_favorites(state.users.as_ref(), id, &p).await?;
    Ok(Json(items))
}

#[instrument(skip(state, auth))]
pub async fn list_reviews(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(p): ApiQuery<Pagination>,
) -> AppResult<Json<Vec<RecipeSummary>>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    let items = services::list_reviews(state.users.as_ref(), id, &p).await?;
    Ok(Json(items))
}

#[instrument(skip(state, auth))]
pub async fn deactivate(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    auth.ensure_owner(id, state.config.enforce_ownership)?;
    services::deactivate(state.users.as_ref(), id).await?;
    Ok(message("User deactivated successfully"))
}
