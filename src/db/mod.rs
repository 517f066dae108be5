//! Persistence seam. Handlers only ever see `Arc<dyn Store>`.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::courses::repo_types::{Course, CoursePatch, CourseWithOwner, NewCourse};
use crate::users::repo_types::{NewUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email address already registered")]
    DuplicateEmail,
    #[error("referenced user does not exist")]
    UnknownUser,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Storage client for users and courses.
///
/// Emails passed in are expected to be normalized already (trimmed, lower-cased).
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with `DuplicateEmail` if the address is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// All courses with their owner's name, oldest first.
    async fn list_courses(&self) -> Result<Vec<CourseWithOwner>, StoreError>;
    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;
    async fn find_course_with_owner(&self, id: Uuid)
        -> Result<Option<CourseWithOwner>, StoreError>;
    async fn create_course(&self, owner: Uuid, course: NewCourse) -> Result<Course, StoreError>;
    /// Returns false when no course has this id.
    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<bool, StoreError>;
    /// Returns false when no course has this id.
    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Release connections. Called once on shutdown.
    async fn close(&self);
}
