//! 报表 API 处理器
//!
//! 日期参数为闭区间，格式 YYYY-MM-DD，均可省略

use axum::{
    Json,
    extract::{Query, State},
};

use stamp_engine::models::{RewardReport, SummaryReport, TransactionReport};

use crate::{
    dto::{ApiResponse, DateRangeQuery},
    error::Result,
    state::{AppState, LoyaltyBackend, ReportBackend},
};

/// GET /api/reports/summary
pub async fn summary<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<SummaryReport>>> {
    let report = state.reports.summary(range.from, range.to).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/reports/rewards
pub async fn rewards<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<RewardReport>>> {
    let report = state.reports.rewards(range.from, range.to).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/reports/transactions
pub async fn transactions<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<ApiResponse<TransactionReport>>> {
    let report = state.reports.transactions(range.from, range.to).await?;
    Ok(Json(ApiResponse::success(report)))
}
