//! 认证服务：注册、登录、改密、资料维护
//!
//! 口令验证在这里完成；凭证的签发与轮换交给 TokenService。

use crate::{
    auth::password::PasswordHasher,
    config::AppConfig,
    error::AppError,
    models::{auth::*, user::*},
    repository::user_repo::UserRepository,
    services::token_service::TokenService,
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthService {
    db: PgPool,
    token_service: Arc<TokenService>,
    config: Arc<AppConfig>,
}

impl AuthService {
    pub fn new(db: PgPool, token_service: Arc<TokenService>, config: Arc<AppConfig>) -> Self {
        Self {
            db,
            token_service,
            config,
        }
    }

    /// 注册新用户并立即签发令牌
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        if user_repo.find_by_email(&req.email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        PasswordHasher::validate_password_policy(&req.password, &self.config)?;

        let hasher = PasswordHasher::new();
        let password_hash = hasher.hash(&req.password)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: req.email.clone(),
            username: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        user_repo.create(&user).await?;

        // 默认角色
        user_repo.add_role(user.id, "User").await?;

        tracing::info!(user_id = %user.id, "User registered");

        self.token_service.issue(&user).await
    }

    /// 登录
    /// 用户不存在、口令错误、账户停用一律返回 InvalidCredential
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        let user = user_repo
            .find_by_email(&req.email)
            .await?
            .ok_or(AppError::InvalidCredential)?;

        if !user.is_active {
            return Err(AppError::InvalidCredential);
        }

        let hasher = PasswordHasher::new();
        hasher.verify(&req.password, &user.password_hash)?;

        user_repo.touch_last_login(user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        self.token_service.issue(&user).await
    }

    /// 登出（撤销单个刷新令牌）
    pub async fn logout(&self, refresh_token: &str, user_id: Uuid) -> Result<(), AppError> {
        self.token_service.revoke(refresh_token).await?;

        tracing::info!(user_id = %user_id, "User logged out");

        Ok(())
    }

    /// 从所有设备登出
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.token_service.revoke_all(user_id).await
    }

    /// 修改密码
    /// 成功后撤销该用户的全部刷新令牌，其他会话必须重新登录
    pub async fn change_password(
        &self,
        user_id: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<u64, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        let user = user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let hasher = PasswordHasher::new();
        hasher.verify(&req.current_password, &user.password_hash)?;

        PasswordHasher::validate_password_policy(&req.new_password, &self.config)?;

        let new_hash = hasher.hash(&req.new_password)?;
        user_repo.update_password(user_id, &new_hash).await?;

        // 撤销级联：改密后所有已签发的刷新令牌立即失效
        let revoked = self.token_service.revoke_all(user_id).await?;

        tracing::info!(user_id = %user_id, revoked, "Password changed");

        Ok(revoked)
    }

    /// 更新资料
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        let updated = user_repo
            .update_profile(user_id, &req.first_name, &req.last_name)
            .await?;

        if !updated {
            return Err(AppError::NotFound);
        }

        self.profile(user_id).await
    }

    /// 当前用户资料投影
    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        let user_repo = UserRepository::new(self.db.clone());

        let user = user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let roles = user_repo.get_roles(user.id).await?;
        let claims = user_repo.get_claims(user.id).await?;

        Ok(UserProfile::from_user(&user, roles, claims))
    }
}
