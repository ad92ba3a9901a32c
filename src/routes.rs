//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
};

use crate::{handlers, middleware::AppState};

/// 请求体大小上限（1 MiB）
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// 创建应用路由
///
/// 所有服务在 main 中显式构造并通过 AppState 注入；这里只做路由
/// 和中间件的编排。
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需认证）
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh_token));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        // 当前用户
        .route("/api/v1/auth/me", get(handlers::auth::get_current_user))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/auth/logout-all", post(handlers::auth::logout_all))
        .route(
            "/api/v1/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route("/api/v1/auth/profile", put(handlers::auth::update_profile))

        // 用户管理（管理员）
        .route("/api/v1/users", get(handlers::user::list_users))
        .route("/api/v1/users/{id}", get(handlers::user::get_user))
        .route(
            "/api/v1/users/{id}/deactivate",
            post(handlers::user::deactivate_user),
        )

        // 车辆管理
        .route(
            "/api/v1/cars",
            get(handlers::car::list_cars).post(handlers::car::create_car),
        )
        .route(
            "/api/v1/cars/{id}",
            get(handlers::car::get_car)
                .put(handlers::car::update_car)
                .delete(handlers::car::delete_car),
        )

        // 所有权关系
        .route(
            "/api/v1/cars/{id}/owners",
            get(handlers::car::list_owners).post(handlers::car::assign_owner),
        )
        .route(
            "/api/v1/cars/{id}/owners/{assignment_id}",
            axum::routing::delete(handlers::car::unassign_owner),
        )

        // 审计轨迹（管理员）
        .route("/api/v1/audit/trail", get(handlers::audit::get_trail))
        .layer(axum::middleware::from_fn_with_state(
            state.jwt_service.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(authenticated_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::request_tracking_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}
