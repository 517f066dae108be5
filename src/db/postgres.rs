use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::config::AppConfig;
use crate::courses::repo_types::{Course, CoursePatch, CourseWithOwner, NewCourse};
use crate::users::repo_types::{NewUser, User};

const COURSE_WITH_OWNER: &str = r#"
    SELECT c.id, c.user_id, c.title, c.description, c.estimated_time,
           c.materials_needed, c.created_at,
           u.first_name AS owner_first_name, u.last_name AS owner_last_name
    FROM courses c
    JOIN users u ON u.id = c.user_id
"#;

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        info!(max_connections = config.db_max_connections, "database connection established");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateEmail;
        }
        if db.is_foreign_key_violation() {
            return StoreError::UnknownUser;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email_address, password, created_at
            FROM users
            WHERE email_address = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, first_name, last_name, email_address, password, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, first_name, last_name, email_address, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, email_address, password, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email_address)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(created)
    }

    async fn list_courses(&self) -> Result<Vec<CourseWithOwner>, StoreError> {
        let sql = format!("{COURSE_WITH_OWNER} ORDER BY c.created_at ASC, c.id ASC");
        let rows = sqlx::query_as::<_, CourseWithOwner>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, user_id, title, description, estimated_time, materials_needed, created_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn find_course_with_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<CourseWithOwner>, StoreError> {
        let sql = format!("{COURSE_WITH_OWNER} WHERE c.id = $1");
        let row = sqlx::query_as::<_, CourseWithOwner>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_course(&self, owner: Uuid, course: NewCourse) -> Result<Course, StoreError> {
        let created = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, user_id, title, description, estimated_time, materials_needed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, description, estimated_time, materials_needed, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.estimated_time)
        .bind(&course.materials_needed)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(created)
    }

    async fn update_course(&self, id: Uuid, patch: CoursePatch) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title            = COALESCE($2, title),
                description      = COALESCE($3, description),
                estimated_time   = CASE WHEN $4 THEN $5 ELSE estimated_time END,
                materials_needed = CASE WHEN $6 THEN $7 ELSE materials_needed END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.estimated_time.is_some())
        .bind(patch.estimated_time.flatten())
        .bind(patch.materials_needed.is_some())
        .bind(patch.materials_needed.flatten())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        debug!("closing database pool");
        self.pool.close().await;
    }
}
