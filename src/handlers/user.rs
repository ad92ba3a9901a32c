//! 用户管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::user::UserProfile,
    repository::UserRepository,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// 列出用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;

    let repo = UserRepository::new(state.db.clone());
    let users = repo
        .list(query.limit.clamp(1, 200), query.offset.max(0))
        .await?;

    let mut profiles = Vec::with_capacity(users.len());
    for user in &users {
        let roles = repo.get_roles(user.id).await?;
        let claims = repo.get_claims(user.id).await?;
        profiles.push(UserProfile::from_user(user, roles, claims));
    }

    Ok(Json(json!({
        "users": profiles,
        "count": profiles.len()
    })))
}

/// 获取用户详情
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;

    let repo = UserRepository::new(state.db.clone());
    let user = repo.find_by_id(id).await?.ok_or(AppError::NotFound)?;

    let roles = repo.get_roles(user.id).await?;
    let claims = repo.get_claims(user.id).await?;

    Ok(Json(UserProfile::from_user(&user, roles, claims)))
}

/// 停用用户账户
/// 账户不做物理删除；停用的同时撤销其全部刷新令牌
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;

    let repo = UserRepository::new(state.db.clone());
    if !repo.deactivate(id).await? {
        return Err(AppError::NotFound);
    }

    let revoked = state.token_service.revoke_all(id).await?;

    Ok(Json(json!({
        "message": "User deactivated",
        "revoked_sessions": revoked
    })))
}
