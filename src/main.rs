//! 车辆管理系统主入口

use fleet_system::{
    config::AppConfig,
    db,
    handlers::health,
    middleware::AppState,
    repository::{AuditStore, AuthRepository},
    routes,
    services::{seed_service, AuditRecorder, AuthService, CarService, TokenService},
    telemetry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ===== CLI 参数处理 =====
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--version" => {
                println!("fleet-system {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("未知参数: {}", args[1]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    // 加载 .env 文件（开发环境）
    // 生产环境应该直接设置环境变量，不依赖 .env 文件
    if let Ok(path) = std::env::var("FLEET_ENV") {
        dotenv::from_filename(format!(".env.{}", path)).ok();
    } else {
        dotenv::from_filename(".env.local").ok();
        dotenv::dotenv().ok();
    }

    // 设置应用启动时间
    health::set_start_time();

    // 1. 加载配置
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    // 2. 初始化日志与指标
    telemetry::init_telemetry(&config);
    telemetry::init_metrics();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Fleet System starting...");

    // 3. 主库连接池 + 迁移
    let db_pool = db::create_pool(&config.database).await?;
    db::run_migrations(&db_pool).await?;

    tracing::info!("Database initialized");

    // 4. 审计库（独立连接池，写入失败不影响业务）
    let audit_store = Arc::new(AuditStore::connect(&config).await?);

    // 5. 初始管理员种子
    seed_service::seed_admin(&db_pool, &config).await?;

    // 6. 显式构造所有服务
    let shared_config = Arc::new(config.clone());
    let jwt_service = Arc::new(fleet_system::auth::jwt::JwtService::from_config(&config)?);

    let token_service = Arc::new(TokenService::new(
        db_pool.clone(),
        jwt_service.clone(),
        shared_config.clone(),
    ));

    let auth_service = Arc::new(AuthService::new(
        db_pool.clone(),
        token_service.clone(),
        shared_config.clone(),
    ));

    let audit_recorder = Arc::new(AuditRecorder::new(audit_store));

    let car_service = Arc::new(CarService::new(db_pool.clone(), audit_recorder.clone()));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        db: db_pool.clone(),
        jwt_service,
        token_service,
        auth_service,
        car_service,
        audit_recorder,
    });

    // 7. 周期性清理过期/已撤销的刷新令牌
    spawn_token_sweeper(db_pool.clone(), &config);

    // 8. 构建路由
    let app = routes::create_router(app_state.clone());

    // 9. 启动服务器
    let addr = &config.server.addr;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        "Server listening"
    );

    // 10. 优雅关闭
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.graceful_shutdown_timeout_secs))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// 启动刷新令牌清理任务
/// 清理逻辑直接走仓库的清扫查询，不经过令牌服务
fn spawn_token_sweeper(db: sqlx::PgPool, config: &fleet_system::config::AppConfig) {
    let interval_secs = config.security.token_sweep_interval_secs;
    let retention_days = config.security.refresh_token_retention_days as i64;

    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
        // 启动时先跳过一轮，避免与迁移抢连接
        interval.tick().await;

        loop {
            interval.tick().await;

            let repo = AuthRepository::new(db.clone());
            match repo.cleanup_expired_tokens(retention_days).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "Swept expired refresh tokens");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Refresh token sweep failed");
                }
            }
        }
    });
}

/// 优雅关闭信号处理
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, starting graceful shutdown");
        },
    }

    // 超时后强制关闭
    tokio::time::sleep(tokio::time::Duration::from_secs(timeout_secs)).await;
    tracing::warn!("Graceful shutdown timeout reached, forcing exit");
}

/// 打印帮助信息
fn print_help() {
    println!("fleet-system {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("用法: fleet-system [选项]");
    println!();
    println!("选项:");
    println!("  --version     打印版本信息并退出");
    println!("  --help        打印此帮助信息并退出");
    println!();
    println!("环境变量:");
    println!("  所有配置通过环境变量完成，前缀为 FLEET_");
}
