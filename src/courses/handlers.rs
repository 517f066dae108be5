use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CourseRequest, CourseResponse},
    services::{self, parse_course_id},
};
use crate::{auth::AuthUser, error::AppError, extract::ApiJson, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses))
        .route("/courses/:id", get(get_course))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/courses", post(create_course))
        .route("/courses/:id", put(update_course).delete(delete_course))
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
) -> Result<Json<Vec<CourseResponse>>, AppError> {
    let courses = services::list_courses(state.store.as_ref()).await?;
    Ok(Json(courses))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>, AppError> {
    let id = parse_course_id(&id)?;
    let course = services::get_course(state.store.as_ref(), id).await?;
    Ok(Json(course))
}

#[instrument(skip(state, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ApiJson(payload): ApiJson<CourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course = services::create_course(state.store.as_ref(), &identity, payload).await?;
    let location = format!("/api/courses/{}", course.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]))
}

#[instrument(skip(state, payload))]
pub async fn update_course(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    payload: Result<ApiJson<CourseRequest>, AppError>,
) -> Result<StatusCode, AppError> {
    let id = parse_course_id(&id)?;
    // body errors surface only after the ownership guard
    let payload = payload.map(|ApiJson(req)| req);
    services::update_course(state.store.as_ref(), &identity, id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_course_id(&id)?;
    services::delete_course(state.store.as_ref(), &identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
