use async_trait::async_trait;
use log::{error, info};
use sqlx::PgPool;

use crate::auth::AuthError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub active: bool,
}

/// 凭证存储网关。认证核心只通过这个接口读取用户记录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;
    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AuthError>;
    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AuthError>;
}

pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, active FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("查询用户失败: {}", e);
            AuthError::Storage(format!("查询用户失败: {}", e))
        })
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AuthError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, active)
            VALUES ($1, $2, TRUE)
            RETURNING id, username, password_hash, active
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("创建用户失败: {}", e);
            AuthError::Storage(format!("创建用户失败: {}", e))
        })
    }

    async fn update_password(&self, user_id: i32, password_hash: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("更新密码失败: {}", e);
                AuthError::Storage(format!("更新密码失败: {}", e))
            })?;
        Ok(())
    }
}

/// 初始化用户表
pub async fn initialize_db(pool: &PgPool) -> Result<(), AuthError> {
    info!("开始初始化数据库...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR UNIQUE NOT NULL,
            password_hash VARCHAR NOT NULL,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        error!("创建用户表失败: {}", e);
        AuthError::Storage(format!("创建用户表失败: {}", e))
    })?;

    info!("数据库初始化完成");
    Ok(())
}
