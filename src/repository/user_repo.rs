//! User repository (用户数据访问)

use crate::{error::AppError, models::user::User};
use sqlx::PgPool;
use uuid::Uuid;

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 创建用户
    pub async fn create(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, username, password_hash, first_name, last_name,
                is_active, last_login_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 根据邮箱查找用户
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 根据 ID 查找用户
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// 列出活跃用户
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE is_active = TRUE ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// 更新用户资料
    pub async fn update_profile(
        &self,
        id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $2, last_name = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 更新密码哈希
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 记录最近登录时间
    pub async fn touch_last_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// 停用账户（软删除，账户不做物理删除）
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.db)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Roles & Claims ====================

    /// 获取用户角色名列表
    pub async fn get_roles(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let roles: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        Ok(roles.into_iter().map(|(r,)| r).collect())
    }

    /// 获取用户权限声明列表
    pub async fn get_claims(&self, user_id: Uuid) -> Result<Vec<String>, AppError> {
        let claims: Vec<(String,)> =
            sqlx::query_as("SELECT claim FROM user_claims WHERE user_id = $1 ORDER BY claim")
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;

        Ok(claims.into_iter().map(|(c,)| c).collect())
    }

    /// 为用户分配角色（已存在时忽略）
    pub async fn add_role(&self, user_id: Uuid, role: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 为用户添加权限声明（已存在时忽略）
    pub async fn add_claim(&self, user_id: Uuid, claim: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO user_claims (user_id, claim) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(claim)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
