use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{error::*, models::*, repository::UserRepository};

const USER_COLUMNS: &str =
    "id, email, full_name, role, is_active, password_hash, last_login_at, created_at, updated_at";

/// PostgreSQL user store (`users` table)
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role: role.parse()?,
        is_active: row.try_get("is_active")?,
        password_hash: row.try_get("password_hash")?,
        last_login_at: row.try_get("last_login_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique {
        IdentityError::EmailAlreadyInUse
    } else {
        IdentityError::DatabaseError(err)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, email, full_name, role, is_active, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        user_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET full_name = $2, role = $3, is_active = $4, password_hash = $5, updated_at = $6
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(IdentityError::UserNotFound)?;

        user_from_row(&row)
    }

    async fn update_last_login(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::UserNotFound);
        }
        Ok(())
    }

    async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let rows = match role {
            Some(role) => {
                sqlx::query(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at, email"
                ))
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, email"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(user_from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
