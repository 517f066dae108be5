use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{dto::{PublicUser, RegisterRequest}, services};
use crate::{auth::AuthUser, error::AppError, extract::ApiJson, state::AppState};

/// Routes that need the identity middleware.
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/users", get(current_user))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/users", post(register))
}

#[instrument(skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state
        .store
        .find_user_by_id(identity.user_id)
        .await?
        .ok_or_else(|| {
            warn!("authenticated user no longer exists");
            AppError::authentication("Access denied")
        })?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    services::register(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, [(header::LOCATION, "/")]))
}
