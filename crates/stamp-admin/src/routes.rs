//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use stamp_shared::observability::middleware as obs_middleware;

use crate::{
    handlers,
    state::{AppState, LoyaltyBackend, ReportBackend},
};

/// 会员相关路由
fn membership_routes<S: LoyaltyBackend, R: ReportBackend>() -> Router<AppState<S, R>> {
    Router::new()
        .route(
            "/memberships/activate-card",
            post(handlers::memberships::activate_card::<S, R>),
        )
        .route(
            "/memberships/lookup",
            get(handlers::memberships::lookup::<S, R>),
        )
        .route(
            "/memberships/{id}",
            get(handlers::memberships::history::<S, R>),
        )
        .route(
            "/memberships/{id}/stamps",
            post(handlers::memberships::award_stamp::<S, R>),
        )
        .route(
            "/memberships/{id}/redeem",
            post(handlers::memberships::redeem::<S, R>),
        )
        .route(
            "/memberships/{id}/replace-card",
            post(handlers::memberships::replace_card::<S, R>),
        )
        .route(
            "/memberships/{id}/status",
            patch(handlers::memberships::set_status::<S, R>),
        )
        .route(
            "/memberships/{id}/summary",
            get(handlers::memberships::cycle_summary::<S, R>),
        )
}

/// 会员卡路由
fn card_routes<S: LoyaltyBackend, R: ReportBackend>() -> Router<AppState<S, R>> {
    Router::new()
        .route("/cards", post(handlers::cards::issue_card::<S, R>))
        .route("/cards/lookup", get(handlers::cards::get_card::<S, R>))
}

/// 计划参数与报表路由
fn admin_routes<S: LoyaltyBackend, R: ReportBackend>() -> Router<AppState<S, R>> {
    Router::new()
        .route(
            "/settings",
            get(handlers::settings::get_settings::<S, R>)
                .put(handlers::settings::update_settings::<S, R>),
        )
        .route(
            "/reports/summary",
            get(handlers::reports::summary::<S, R>),
        )
        .route(
            "/reports/rewards",
            get(handlers::reports::rewards::<S, R>),
        )
        .route(
            "/reports/transactions",
            get(handlers::reports::transactions::<S, R>),
        )
}

/// 全部 API 路由（挂载在 /api 下）
pub fn api_routes<S: LoyaltyBackend, R: ReportBackend>() -> Router<AppState<S, R>> {
    Router::new()
        .merge(membership_routes())
        .merge(card_routes())
        .merge(admin_routes())
}

/// 构建完整应用路由
///
/// 包含 /api 业务路由、/health 存活探针以及请求追踪中间件
pub fn build_router<S: LoyaltyBackend, R: ReportBackend>(state: AppState<S, R>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(handlers::health::health_check))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
