use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use fieldgate_auth::{NewUser, User, UserStatus};
use fieldgate_core::{RoleId, UserId};

use super::map_sqlx_error;
use crate::store::{CredentialStore, StoreError};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role_id, invitation_token, status, is_admin, created_at";

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: PgPool,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Decode(format!("users row: {}", e));
    let status: String = row.try_get("status").map_err(decode)?;
    let status: UserStatus = status
        .parse()
        .map_err(|_| StoreError::Decode(format!("users row has unknown status '{status}'")))?;

    Ok(User {
        id: UserId::new(row.try_get("id").map_err(decode)?),
        username: row.try_get("username").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        role_id: RoleId::new(row.try_get("role_id").map_err(decode)?),
        invitation_token: row.try_get("invitation_token").map_err(decode)?,
        status,
        is_admin: row.try_get("is_admin").map_err(decode)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(decode)?,
    })
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self, user), fields(username = %user.username), err)]
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, role_id, invitation_token, status, is_admin)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id.get())
        .bind(&user.invitation_token)
        .bind(user.status.as_str())
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        user_from_row(&row)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn save_user(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2,
                email = $3,
                password_hash = $4,
                role_id = $5,
                invitation_token = $6,
                status = $7,
                is_admin = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id.get())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role_id.get())
        .bind(&user.invitation_token)
        .bind(user.status.as_str())
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_id", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_username", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, token), err)]
    async fn user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE invitation_token = $1"))
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("user_by_token", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn count_users_with_role(&self, role_id: RoleId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1")
            .bind(role_id.get())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users_with_role", e))?;

        Ok(count.max(0) as u64)
    }
}
