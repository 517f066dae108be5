use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::courses::repo_types::{Course, CoursePatch, CourseWithOwner, NewCourse};
use crate::users::repo_types::{NewUser, User};

/// In-process store used by tests and `DATABASE_URL=memory://` runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // insertion order doubles as creation order
    courses: Vec<Course>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn with_owner(&self, course: &Course) -> Option<CourseWithOwner> {
        let owner = self.users.get(&course.user_id)?;
        Some(CourseWithOwner {
            id: course.id,
            user_id: course.user_id,
            title: course.title.clone(),
            description: course.description.clone(),
            estimated_time: course.estimated_time.clone(),
            materials_needed: course.materials_needed.clone(),
            created_at: course.created_at,
            owner_first_name: owner.first_name.clone(),
            owner_last_name: owner.last_name.clone(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.email_address == email)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email_address == user.email_address)
        {
            return Err(StoreError::DuplicateEmail);
        }
        let created = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email_address: user.email_address,
            password: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_courses(&self) -> Result<Vec<CourseWithOwner>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .courses
            .iter()
            .filter_map(|c| inner.with_owner(c))
            .collect())
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn find_course_with_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<CourseWithOwner>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .courses
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| inner.with_owner(c)))
    }

    async fn create_course(&self, owner: Uuid, course: NewCourse) -> Result<Course, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&owner) {
            return Err(StoreError::UnknownUser);
        }
        let created = Course {
            id: Uuid::new_v4(),
            user_id: owner,
            title: course.title,
            description: course.description,
            estimated_time: course.estimated_time,
            materials_needed: course.materials_needed,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.courses.push(created.clone());
        Ok(created)
    }

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(course) = inner.courses.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        if let Some(title) = patch.title {
            course.title = title;
        }
        if let Some(description) = patch.description {
            course.description = description;
        }
        if let Some(estimated_time) = patch.estimated_time {
            course.estimated_time = estimated_time;
        }
        if let Some(materials_needed) = patch.materials_needed {
            course.materials_needed = materials_needed;
        }
        Ok(true)
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.courses.len();
        inner.courses.retain(|c| c.id != id);
        Ok(inner.courses.len() < before)
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email_address: email.into(),
            password_hash: "$argon2id$fake".into(),
        }
    }

    fn new_course(title: &str) -> NewCourse {
        NewCourse {
            title: title.into(),
            description: "desc".into(),
            estimated_time: None,
            materials_needed: None,
        }
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create_user(new_user("ada@example.com")).await.unwrap();
        let err = store
            .create_user(new_user("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn create_course_requires_existing_owner() {
        let store = MemoryStore::new();
        let err = store
            .create_course(Uuid::new_v4(), new_course("Rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser));
    }

    #[tokio::test]
    async fn list_courses_keeps_creation_order_and_owner_names() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("ada@example.com")).await.unwrap();
        store.create_course(owner.id, new_course("First")).await.unwrap();
        store.create_course(owner.id, new_course("Second")).await.unwrap();

        let courses = store.list_courses().await.unwrap();
        let titles: Vec<_> = courses.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        assert!(courses.iter().all(|c| c.owner_first_name == "Ada"));
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("ada@example.com")).await.unwrap();
        let course = store.create_course(owner.id, new_course("Old")).await.unwrap();

        let patch = CoursePatch {
            estimated_time: Some(Some("3 hours".into())),
            ..CoursePatch::default()
        };
        assert!(store.update_course(course.id, patch).await.unwrap());

        let stored = store.find_course(course.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Old");
        assert_eq!(stored.estimated_time.as_deref(), Some("3 hours"));
    }

    #[tokio::test]
    async fn update_with_explicit_none_clears_optional_field() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("ada@example.com")).await.unwrap();
        let mut course = new_course("Rust");
        course.estimated_time = Some("3 hours".into());
        course.materials_needed = Some("Laptop".into());
        let course = store.create_course(owner.id, course).await.unwrap();

        let patch = CoursePatch {
            estimated_time: Some(None),
            ..CoursePatch::default()
        };
        assert!(store.update_course(course.id, patch).await.unwrap());

        let stored = store.find_course(course.id).await.unwrap().unwrap();
        assert_eq!(stored.estimated_time, None);
        assert_eq!(stored.materials_needed.as_deref(), Some("Laptop"));
    }

    #[tokio::test]
    async fn delete_reports_missing_course() {
        let store = MemoryStore::new();
        let owner = store.create_user(new_user("ada@example.com")).await.unwrap();
        let course = store.create_course(owner.id, new_course("Rust")).await.unwrap();

        assert!(store.delete_course(course.id).await.unwrap());
        assert!(!store.delete_course(course.id).await.unwrap());
        assert!(store.find_course(course.id).await.unwrap().is_none());
    }
}
