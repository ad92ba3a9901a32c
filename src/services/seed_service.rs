//! 初始管理员种子
//! 仅在账户不存在且配置了初始密码时创建

use crate::{
    auth::password::PasswordHasher,
    config::AppConfig,
    error::AppError,
    models::user::User,
    repository::user_repo::UserRepository,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use uuid::Uuid;

/// 确保初始管理员存在
pub async fn seed_admin(db: &PgPool, config: &AppConfig) -> Result<(), AppError> {
    let Some(password) = &config.security.seed_admin_password else {
        tracing::debug!("Admin seed password not configured, skipping seed");
        return Ok(());
    };

    let user_repo = UserRepository::new(db.clone());
    let email = &config.security.seed_admin_email;

    if user_repo.find_by_email(email).await?.is_some() {
        tracing::debug!(email = %email, "Admin account already exists");
        return Ok(());
    }

    let hasher = PasswordHasher::new();
    let password_hash = hasher.hash(password.expose_secret())?;

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        email: email.clone(),
        username: email.clone(),
        password_hash,
        first_name: "System".to_string(),
        last_name: "Administrator".to_string(),
        is_active: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };

    user_repo.create(&admin).await?;
    user_repo.add_role(admin.id, "Admin").await?;
    user_repo.add_role(admin.id, "User").await?;
    user_repo.add_claim(admin.id, "cars.manage").await?;
    user_repo.add_claim(admin.id, "audit.read").await?;

    tracing::info!(email = %email, "Seeded admin account");

    Ok(())
}
