//! 计划参数 API 处理器

use axum::{Json, extract::State};

use stamp_engine::models::{ProgramSettings, SettingsPatch};

use crate::{
    dto::ApiResponse,
    error::Result,
    state::{AppState, LoyaltyBackend, ReportBackend},
};

/// GET /api/settings
pub async fn get_settings<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
) -> Result<Json<ApiResponse<ProgramSettings>>> {
    let settings = state.settings.get_settings().await?;
    Ok(Json(ApiResponse::success(settings.as_ref().clone())))
}

/// 部分更新参数，未提供的字段保持不变
///
/// PUT /api/settings
pub async fn update_settings<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<ApiResponse<ProgramSettings>>> {
    let settings = state.settings.update_settings(patch).await?;
    Ok(Json(ApiResponse::success(settings)))
}
