//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User},
};

const USER_COLUMNS: &str = r#"
    id, username, email, hashed_password, full_name, is_active, role,
    company_department_id, company_id, manager_id, avatar_url, created_at
"#;

/// Reporting hierarchy lookups used to address notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManagerDirectory: Send + Sync {
    /// Managers above a user, nearest first
    async fn manager_ids(&self, user_id: i32) -> AppResult<Vec<i32>>;

    /// Subset of `ids` belonging to active users
    async fn active_users(&self, ids: Vec<i32>) -> AppResult<Vec<i32>>;
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (login identifier)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if a username or email is already taken
    pub async fn identity_exists(&self, username: &str, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR LOWER(email) = LOWER($2))",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a new user
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
        full_name: Option<&str>,
        role: Role,
    ) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, hashed_password, full_name, is_active, role)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .bind(hashed_password)
        .bind(full_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Change a user's role
    pub async fn set_role(&self, id: i32, role: Role) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}

#[async_trait]
impl ManagerDirectory for UsersRepository {
    async fn manager_ids(&self, user_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            r#"
            WITH RECURSIVE chain AS (
                SELECT manager_id AS id, 1 AS depth FROM users WHERE id = $1
                UNION
                SELECT u.manager_id, c.depth + 1
                FROM users u JOIN chain c ON u.id = c.id
                WHERE c.depth < 32
            )
            SELECT id FROM chain
            WHERE id IS NOT NULL AND id <> $1
            GROUP BY id
            ORDER BY MIN(depth)
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn active_users(&self, ids: Vec<i32>) -> AppResult<Vec<i32>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let active = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM users WHERE id = ANY($1) AND is_active = TRUE ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(active)
    }
}
