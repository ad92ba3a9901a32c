//! 车辆管理的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::{AppState, RequestTrace},
    models::car::*,
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
use validator::Validate;

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

/// 列出车辆
pub async fn list_cars(
    State(state): State<Arc<AppState>>,
    _auth_context: AuthContext,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cars = state
        .car_service
        .list_cars(query.limit.clamp(1, 200), query.offset.max(0))
        .await?;

    let responses: Vec<CarResponse> = cars.into_iter().map(CarResponse::from).collect();

    Ok(Json(json!({
        "cars": responses,
        "count": responses.len()
    })))
}

/// 创建车辆
pub async fn create_car(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    trace: RequestTrace,
    Json(req): Json<CreateCarRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;
    req.validate()?;

    let car = state
        .car_service
        .create_car(req, auth_context.user_id, &trace.trace_id)
        .await?;

    Ok(Json(json!({
        "message": "Car created successfully",
        "car": CarResponse::from(car)
    })))
}

/// 获取车辆详情
pub async fn get_car(
    State(state): State<Arc<AppState>>,
    _auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let car = state.car_service.get_car(id).await?;

    Ok(Json(CarResponse::from(car)))
}

/// 更新车辆
pub async fn update_car(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    trace: RequestTrace,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCarRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;
    req.validate()?;

    let car = state
        .car_service
        .update_car(id, req, auth_context.user_id, &trace.trace_id)
        .await?;

    Ok(Json(json!({
        "message": "Car updated successfully",
        "car": CarResponse::from(car)
    })))
}

/// 删除车辆（软删除）
pub async fn delete_car(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    trace: RequestTrace,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;

    state
        .car_service
        .delete_car(id, auth_context.user_id, &trace.trace_id)
        .await?;

    Ok(Json(json!({"message": "Car deleted successfully"})))
}

/// 分配所有者
pub async fn assign_owner(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    trace: RequestTrace,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignOwnerRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;
    req.validate()?;

    let assignment = state
        .car_service
        .assign_owner(id, req, auth_context.user_id, &trace.trace_id)
        .await?;

    Ok(Json(json!({
        "message": "Owner assigned successfully",
        "assignment": assignment
    })))
}

/// 列出车辆的所有权关系
pub async fn list_owners(
    State(state): State<Arc<AppState>>,
    _auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let assignments = state.car_service.list_owners(id).await?;

    Ok(Json(json!({
        "assignments": assignments,
        "count": assignments.len()
    })))
}

/// 解除所有权关系
pub async fn unassign_owner(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    trace: RequestTrace,
    Path((_id, assignment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role("Admin")?;

    state
        .car_service
        .unassign_owner(assignment_id, auth_context.user_id, &trace.trace_id)
        .await?;

    Ok(Json(json!({"message": "Owner unassigned successfully"})))
}
