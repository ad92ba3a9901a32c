//! 认证服务集成测试
//! 需要数据库，未设置 TEST_DATABASE_URL 时跳过

use fleet_system::{
    error::AppError,
    models::user::{ChangePasswordRequest, LoginRequest, RegisterRequest},
};

mod common;
use common::{build_app_state, create_test_config, setup_test_db, unique_email};

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        password: "Password1".to_string(),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let Some(pool) = setup_test_db().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let state = build_app_state(create_test_config(), pool);

    let email = unique_email("register");
    let registered = state
        .auth_service
        .register(register_request(&email))
        .await
        .unwrap();

    assert_eq!(registered.user.email, email);
    assert!(registered.user.roles.contains(&"User".to_string()));
    assert!(!registered.access_token.is_empty());

    let logged_in = state
        .auth_service
        .login(LoginRequest {
            email,
            password: "Password1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(logged_in.user.id, registered.user.id);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let Some(pool) = setup_test_db().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let state = build_app_state(create_test_config(), pool);

    let email = unique_email("dup");
    state
        .auth_service
        .register(register_request(&email))
        .await
        .unwrap();

    let err = state
        .auth_service
        .register(register_request(&email))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_login_wrong_password_fails() {
    let Some(pool) = setup_test_db().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let state = build_app_state(create_test_config(), pool);

    let email = unique_email("wrong-pass");
    state
        .auth_service
        .register(register_request(&email))
        .await
        .unwrap();

    let err = state
        .auth_service
        .login(LoginRequest {
            email,
            password: "NotThePassword9".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidCredential));
}

#[tokio::test]
async fn test_login_unknown_email_fails_identically() {
    let Some(pool) = setup_test_db().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let state = build_app_state(create_test_config(), pool);

    let err = state
        .auth_service
        .login(LoginRequest {
            email: unique_email("ghost"),
            password: "Password1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidCredential));
}

#[tokio::test]
async fn test_change_password_revokes_all_sessions() {
    let Some(pool) = setup_test_db().await else {
        eprintln!("skipping: TEST_DATABASE_URL not set");
        return;
    };
    let state = build_app_state(create_test_config(), pool);

    let email = unique_email("cascade");
    let registered = state
        .auth_service
        .register(register_request(&email))
        .await
        .unwrap();

    // 第二个会话
    let second = state
        .auth_service
        .login(LoginRequest {
            email: email.clone(),
            password: "Password1".to_string(),
        })
        .await
        .unwrap();

    let revoked = state
        .auth_service
        .change_password(
            registered.user.id,
            ChangePasswordRequest {
                current_password: "Password1".to_string(),
                new_password: "Password2".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(revoked, 2);

    // 改密前签发的刷新令牌全部失效
    for token in [&registered.refresh_token, &second.refresh_token] {
        assert!(matches!(
            state.token_service.refresh(token).await,
            Err(AppError::InvalidCredential)
        ));
    }

    // 旧密码不能再登录，新密码可以
    assert!(state
        .auth_service
        .login(LoginRequest {
            email: email.clone(),
            password: "Password1".to_string(),
        })
        .await
        .is_err());

    assert!(state
        .auth_service
        .login(LoginRequest {
            email,
            password: "Password2".to_string(),
        })
        .await
        .is_ok());
}
