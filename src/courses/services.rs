use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{CourseRequest, CourseResponse};
use super::repo_types::{Course, CoursePatch, NewCourse};
use crate::auth::Identity;
use crate::db::Store;
use crate::error::{AppError, FieldError};

const TITLE_REQUIRED: FieldError = FieldError::new("title", "Title is required.");
const DESCRIPTION_REQUIRED: FieldError = FieldError::new("description", "Description is required.");

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn validate_new_course(req: &CourseRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.title.as_deref().map_or(true, is_blank) {
        errors.push(TITLE_REQUIRED);
    }
    if req.description.as_deref().map_or(true, is_blank) {
        errors.push(DESCRIPTION_REQUIRED);
    }
    errors
}

/// Absent fields are fine in a partial update; present required ones must not be blank.
pub fn validate_course_patch(req: &CourseRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if req.title.as_deref().is_some_and(is_blank) {
        errors.push(TITLE_REQUIRED);
    }
    if req.description.as_deref().is_some_and(is_blank) {
        errors.push(DESCRIPTION_REQUIRED);
    }
    errors
}

/// Unparseable ids cannot name a course, so they are reported as not found.
pub fn parse_course_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Course not found"))
}

/// Passes only when the identity created the course.
pub fn ensure_owner(identity: &Identity, course: &Course) -> Result<(), AppError> {
    if identity.user_id == course.user_id {
        return Ok(());
    }
    warn!(
        user_id = %identity.user_id,
        course_id = %course.id,
        owner_id = %course.user_id,
        "course mutation by non-owner"
    );
    Err(AppError::authorization("You do not own this course"))
}

/// Resolve the course first (404), then check ownership (403).
async fn load_owned_course(
    store: &dyn Store,
    identity: &Identity,
    id: Uuid,
) -> Result<Course, AppError> {
    let course = store
        .find_course(id)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    ensure_owner(identity, &course)?;
    Ok(course)
}

pub async fn list_courses(store: &dyn Store) -> Result<Vec<CourseResponse>, AppError> {
    let rows = store.list_courses().await?;
    Ok(rows.into_iter().map(CourseResponse::from).collect())
}

pub async fn get_course(store: &dyn Store, id: Uuid) -> Result<CourseResponse, AppError> {
    store
        .find_course_with_owner(id)
        .await?
        .map(CourseResponse::from)
        .ok_or_else(|| AppError::not_found("Course not found"))
}

pub async fn create_course(
    store: &dyn Store,
    identity: &Identity,
    req: CourseRequest,
) -> Result<Course, AppError> {
    let errors = validate_new_course(&req);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let course = store
        .create_course(
            identity.user_id,
            NewCourse {
                title: req.title.unwrap_or_default(),
                description: req.description.unwrap_or_default(),
                estimated_time: req.estimated_time.flatten(),
                materials_needed: req.materials_needed.flatten(),
            },
        )
        .await?;

    info!(course_id = %course.id, user_id = %identity.user_id, "course created");
    Ok(course)
}

pub async fn update_course(
    store: &dyn Store,
    identity: &Identity,
    id: Uuid,
    req: Result<CourseRequest, AppError>,
) -> Result<(), AppError> {
    load_owned_course(store, identity, id).await?;

    let req = req?;
    let errors = validate_course_patch(&req);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let patch = CoursePatch {
        title: req.title,
        description: req.description,
        estimated_time: req.estimated_time,
        materials_needed: req.materials_needed,
    };
    // the course may have been deleted since it was loaded
    if !store.update_course(id, patch).await? {
        return Err(AppError::not_found("Course not found"));
    }

    info!(course_id = %id, user_id = %identity.user_id, "course updated");
    Ok(())
}

pub async fn delete_course(store: &dyn Store, identity: &Identity, id: Uuid) -> Result<(), AppError> {
    load_owned_course(store, identity, id).await?;

    if !store.delete_course(id).await? {
        return Err(AppError::not_found("Course not found"));
    }

    info!(course_id = %id, user_id = %identity.user_id, "course deleted");
    Ok(())
}
