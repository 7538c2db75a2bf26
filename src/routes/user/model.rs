use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppError;
use crate::utils::{hash_password, verify_password};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub cnic: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// 管理后台展示用，不含密码
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub cnic: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cnic: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub cnic: String,
    pub password: String,
}

#[derive(Debug)]
pub enum AdminCreation {
    Created(User),
    AlreadyExists,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 邮箱统一转小写后存储和比较
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SignupForm {
    /// 任一字段缺失或为空时返回 None
    pub fn into_new_user(self) -> Option<NewUser> {
        Some(NewUser {
            name: non_empty(self.name)?,
            email: normalize_email(&non_empty(self.email)?),
            cnic: non_empty(self.cnic)?,
            // 密码不做 trim
            password: self.password.filter(|p| !p.is_empty())?,
        })
    }
}

impl LoginForm {
    pub fn credentials(self) -> Option<(String, String)> {
        Some((
            normalize_email(&non_empty(self.email)?),
            self.password.filter(|p| !p.is_empty())?,
        ))
    }
}

const USER_COLUMNS: &str = "id, name, email, cnic, password, role, created_at";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

impl User {
    pub fn role(&self) -> Option<UserRole> {
        UserRole::parse(&self.role)
    }

    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<Self, sqlx::Error> {
        Self::insert(pool, new_user, UserRole::User).await
    }

    async fn insert(pool: &PgPool, new_user: NewUser, role: UserRole) -> Result<Self, sqlx::Error> {
        // bcrypt 计算量大，放到阻塞线程池
        let password = new_user.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| sqlx::Error::Protocol(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| sqlx::Error::Protocol(format!("Failed to hash password: {}", e)))?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, cnic, password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.cnic)
        .bind(&password_hash)
        .bind(role.as_str())
        .fetch_one(pool)
        .await?;

        tracing::info!("Created {} account {}", role.as_str(), user.id);
        Ok(user)
    }

    /// 已存在同邮箱账号时不重复创建
    pub async fn create_admin(pool: &PgPool, new_user: NewUser) -> Result<AdminCreation, sqlx::Error> {
        if Self::find_by_email(pool, &new_user.email).await?.is_some() {
            return Ok(AdminCreation::AlreadyExists);
        }
        match Self::insert(pool, new_user, UserRole::Admin).await {
            Ok(user) => Ok(AdminCreation::Created(user)),
            Err(e) if is_unique_violation(&e) => Ok(AdminCreation::AlreadyExists),
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists_by_email_or_cnic(
        pool: &PgPool,
        email: &str,
        cnic: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1) OR cnic = $2)",
        )
        .bind(email)
        .bind(cnic)
        .fetch_one(pool)
        .await
    }

    pub async fn role_of(pool: &PgPool, email: &str) -> Result<Option<UserRole>, sqlx::Error> {
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(role.as_deref().and_then(UserRole::parse))
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, name, email, cnic, role, created_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn verify_login(&self, password: String) -> Result<bool, AppError> {
        let hash = self.password.clone();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("password verification task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))
    }
}
