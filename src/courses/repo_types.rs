use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub estimated_time: Option<String>,
    pub materials_needed: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Course joined with the owner's public name fields.
#[derive(Debug, Clone, FromRow)]
pub struct CourseWithOwner {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub estimated_time: Option<String>,
    pub materials_needed: Option<String>,
    pub created_at: OffsetDateTime,
    pub owner_first_name: String,
    pub owner_last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub estimated_time: Option<String>,
    pub materials_needed: Option<String>,
}

/// Fields left as `None` keep their stored value; `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub estimated_time: Option<Option<String>>,
    pub materials_needed: Option<Option<String>>,
}
