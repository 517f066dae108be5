use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::repo_types::CourseWithOwner;

/// Body of `POST /api/courses` and `PUT /api/courses/:id`.
/// Carries no owner field; the owner is the authenticated identity.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` when absent, `Some(None)` when sent as `null`.
    #[serde(default, deserialize_with = "present")]
    pub estimated_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub materials_needed: Option<Option<String>>,
}

/// Marks a field as present, keeping an explicit `null` distinguishable from absence.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Owner fields populated into course output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOwner {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub estimated_time: Option<String>,
    pub materials_needed: Option<String>,
    pub user: CourseOwner,
}

impl From<CourseWithOwner> for CourseResponse {
    fn from(c: CourseWithOwner) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            estimated_time: c.estimated_time,
            materials_needed: c.materials_needed,
            user: CourseOwner {
                id: c.user_id,
                first_name: c.owner_first_name,
                last_name: c.owner_last_name,
            },
        }
    }
}
