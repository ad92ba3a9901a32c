//! API 路由集成测试
//! 使用惰性连接池，不触达数据库的路由无需真实数据库

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

mod common;
use common::create_test_app_state;

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_app_state();
    let app = fleet_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let state = create_test_app_state();
    let app = fleet_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/cars")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_rejects_garbage_token() {
    let state = create_test_app_state();
    let app = fleet_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/audit/trail?table=cars&entity_id=x")
                .header("authorization", "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_trace_id_propagates_to_response() {
    let state = create_test_app_state();
    let app = fleet_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "trace-abc-123"
    );
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_audit_trail_requires_admin_role() {
    let state = create_test_app_state();

    // 普通用户令牌：签名有效但没有 Admin 角色
    let user = fleet_system::models::user::User {
        id: uuid::Uuid::new_v4(),
        email: "plain@fleet.test".to_string(),
        username: "plain@fleet.test".to_string(),
        password_hash: "hash".to_string(),
        first_name: "Plain".to_string(),
        last_name: "User".to_string(),
        is_active: true,
        last_login_at: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    let (token, _) = state
        .jwt_service
        .generate_access_token(&user, vec!["User".to_string()], vec![])
        .unwrap();

    let app = fleet_system::routes::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/audit/trail?table=cars&entity_id=x")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
