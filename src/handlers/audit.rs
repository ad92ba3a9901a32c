//! 审计轨迹的 HTTP 处理器

use crate::{auth::middleware::AuthContext, error::AppError, middleware::AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TrailQuery {
    pub table: String,
    pub entity_id: String,
}

/// 查询实体的审计轨迹（最近的记录在前）
pub async fn get_trail(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Query(query): Query<TrailQuery>,
) -> Result<impl IntoResponse, AppError> {
    // 只有管理员可以访问审计轨迹
    auth_context.require_role("Admin")?;

    let entries = state
        .audit_recorder
        .trail(&query.table, &query.entity_id)
        .await?;

    Ok(Json(json!({
        "entries": entries,
        "count": entries.len()
    })))
}
