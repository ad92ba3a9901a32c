//! 令牌服务：签发、轮换、撤销
//!
//! 每次签发产生一条刷新令牌记录；轮换在单个事务内撤销旧记录并写入
//! 后继记录，并发使用同一刷新令牌时至多一方成功。

use crate::{
    auth::{jwt::JwtService, refresh::RefreshTokenGenerator},
    config::AppConfig,
    error::AppError,
    models::{auth::*, user::*},
    repository::{auth_repo::AuthRepository, user_repo::UserRepository},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub struct TokenService {
    db: PgPool,
    jwt_service: Arc<JwtService>,
    config: Arc<AppConfig>,
}

impl TokenService {
    pub fn new(db: PgPool, jwt_service: Arc<JwtService>, config: Arc<AppConfig>) -> Self {
        Self {
            db,
            jwt_service,
            config,
        }
    }

    /// 为已验证的用户签发访问令牌 + 刷新令牌
    ///
    /// 调用方负责身份验证；这里只负责凭证的生成与持久化。
    pub async fn issue(&self, user: &User) -> Result<AuthResponse, AppError> {
        let user_repo = UserRepository::new(self.db.clone());
        let auth_repo = AuthRepository::new(self.db.clone());

        let roles = user_repo.get_roles(user.id).await?;
        let claims = user_repo.get_claims(user.id).await?;

        let (access_token, expires_at) =
            self.jwt_service
                .generate_access_token(user, roles.clone(), claims.clone())?;

        // 生成不透明刷新令牌，仅存储哈希
        let refresh_value = RefreshTokenGenerator::generate();
        let record = self.new_refresh_record(user.id, &refresh_value);

        auth_repo.store_refresh_token(&record).await?;

        tracing::debug!(user_id = %user.id, token_id = %record.id, "Issued credential pair");

        Ok(AuthResponse {
            access_token,
            refresh_token: refresh_value,
            expires_at,
            user: UserProfile::from_user(user, roles, claims),
        })
    }

    /// 用刷新令牌换取新的令牌对（轮换）
    ///
    /// 刷新令牌本身是唯一的授权依据；找不到或不再活跃一律返回
    /// InvalidCredential，不区分原因。旧记录被撤销并指向后继记录。
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AppError> {
        let auth_repo = AuthRepository::new(self.db.clone());
        let user_repo = UserRepository::new(self.db.clone());

        let token_hash = RefreshTokenGenerator::hash(refresh_token);
        let record = auth_repo
            .find_refresh_token_by_hash(&token_hash)
            .await?
            .ok_or(AppError::InvalidCredential)?;

        if !record.is_active(Utc::now()) {
            return Err(AppError::InvalidCredential);
        }

        let user = user_repo
            .find_by_id(record.user_id)
            .await?
            .ok_or(AppError::InvalidCredential)?;

        let roles = user_repo.get_roles(user.id).await?;
        let claims = user_repo.get_claims(user.id).await?;

        let (access_token, expires_at) =
            self.jwt_service
                .generate_access_token(&user, roles.clone(), claims.clone())?;

        let refresh_value = RefreshTokenGenerator::generate();
        let successor = self.new_refresh_record(user.id, &refresh_value);

        // 撤销旧记录并插入后继记录，原子完成；并发轮换的落败方在此失败
        let rotated = auth_repo
            .rotate_refresh_token(&token_hash, &successor)
            .await?;

        if !rotated {
            tracing::debug!(token_id = %record.id, "Refresh token lost rotation race");
            return Err(AppError::InvalidCredential);
        }

        tracing::debug!(
            user_id = %user.id,
            old_token_id = %record.id,
            new_token_id = %successor.id,
            "Rotated refresh token"
        );

        Ok(AuthResponse {
            access_token,
            refresh_token: refresh_value,
            expires_at,
            user: UserProfile::from_user(&user, roles, claims),
        })
    }

    /// 撤销单个刷新令牌
    /// 幂等：令牌不存在、已撤销或已过期时静默成功
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        let auth_repo = AuthRepository::new(self.db.clone());
        let token_hash = RefreshTokenGenerator::hash(refresh_token);

        let revoked = auth_repo.revoke_refresh_token_by_hash(&token_hash).await?;

        tracing::debug!(revoked, "Refresh token revoke requested");

        Ok(())
    }

    /// 撤销用户的所有活跃刷新令牌
    /// 改密后调用，强制其他会话重新登录；没有活跃令牌时也返回成功
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let auth_repo = AuthRepository::new(self.db.clone());
        let count = auth_repo.revoke_all_refresh_tokens(user_id).await?;

        tracing::info!(user_id = %user_id, count, "Revoked all refresh tokens");

        Ok(count)
    }

    /// 构造刷新令牌记录
    fn new_refresh_record(&self, user_id: Uuid, refresh_value: &str) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshTokenGenerator::hash(refresh_value),
            user_id,
            created_at: now,
            expires_at: now
                + Duration::days(self.config.security.refresh_token_exp_days as i64),
            revoked_at: None,
            replaced_by: None,
        }
    }
}
