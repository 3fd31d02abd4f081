//! 集点卡管理服务
//!
//! 提供开卡、印花发放、奖励核销、换卡、参数和报表的 REST API。

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use stamp_admin::{build_router, state::AppState};
use stamp_engine::models::ProgramSettings;
use stamp_engine::repository::{PgLoyaltyStore, ReportRepository};
use stamp_shared::{config::AppConfig, database::Database, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 统一加载配置：config/default.toml -> config/{env}.toml -> config/stamp-admin.toml -> 环境变量
    let config = AppConfig::load("stamp-admin")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting stamp-admin on {}", config.server_addr());

    // 计划参数默认值在启动时校验，配置错误直接退出
    let defaults = ProgramSettings::try_from(&config.program)?;

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations().await?;
    }

    let store = Arc::new(PgLoyaltyStore::new(db.pool().clone(), defaults));
    let reports = Arc::new(ReportRepository::new(db.pool().clone()));
    let state = AppState::new(store, reports);

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(cors_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_seconds,
            ))),
    );

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// CORS 配置：STAMP_CORS_ORIGINS 为逗号分隔的来源列表，`*` 表示不限制
fn cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("STAMP_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if allowed_origins == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 监听关闭信号（Ctrl+C 或 SIGTERM）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
