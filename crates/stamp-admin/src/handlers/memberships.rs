//! 会员 API 处理器
//!
//! 开卡、查找、历史、印花发放、奖励核销、换卡和状态管理

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use validator::Validate;

use stamp_engine::models::{CycleSummary, MembershipDetail, Stamp};

use crate::{
    dto::{
        ActivateCardBody, ApiResponse, AwardStampBody, LookupQuery, NOTHING_TO_REDEEM,
        NO_STAMP_AWARDED, RedeemBody, ReplaceCardBody, SetStatusBody, SummaryQuery,
    },
    error::Result,
    state::{AppState, LoyaltyBackend, ReportBackend},
};

/// 开卡
///
/// POST /api/memberships/activate-card
pub async fn activate_card<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Json(body): Json<ActivateCardBody>,
) -> Result<Json<ApiResponse<MembershipDetail>>> {
    body.validate()?;

    let detail = state.memberships.activate_card(body.into()).await?;

    info!(
        membership_id = detail.membership.id,
        card_number = %detail.membership.card_number,
        "开卡完成"
    );
    Ok(Json(ApiResponse::success(detail)))
}

/// 按卡号、手机号或卡片 ID 查找会员
///
/// GET /api/memberships/lookup?q=
pub async fn lookup<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ApiResponse<MembershipDetail>>> {
    let detail = state.query.lookup(&query.q).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 会员历史
///
/// GET /api/memberships/{id}
pub async fn history<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MembershipDetail>>> {
    let detail = state.query.history(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 为一笔交易发放印花
///
/// POST /api/memberships/{id}/stamps
///
/// 会员无效或金额未达门槛时返回 200 且 data 为 null
pub async fn award_stamp<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Path(id): Path<i64>,
    Json(body): Json<AwardStampBody>,
) -> Result<Json<ApiResponse<Stamp>>> {
    body.validate()?;

    let stamp = state.award.award_stamp(body.into_request(id)?).await?;
    Ok(Json(ApiResponse::optional(stamp, NO_STAMP_AWARDED)))
}

/// 核销奖励
///
/// POST /api/memberships/{id}/redeem
pub async fn redeem<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Path(id): Path<i64>,
    Json(body): Json<RedeemBody>,
) -> Result<Json<ApiResponse<Stamp>>> {
    let reward_type = body.reward_type()?;

    let stamp = state.redemption.redeem(id, reward_type).await?;
    Ok(Json(ApiResponse::optional(stamp, NOTHING_TO_REDEEM)))
}

/// 换卡
///
/// POST /api/memberships/{id}/replace-card
pub async fn replace_card<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Path(id): Path<i64>,
    Json(body): Json<ReplaceCardBody>,
) -> Result<Json<ApiResponse<MembershipDetail>>> {
    body.validate()?;

    let detail = state.cards.replace_card(body.into_request(id)).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 冻结 / 解冻会员
///
/// PATCH /api/memberships/{id}/status
pub async fn set_status<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Path(id): Path<i64>,
    Json(body): Json<SetStatusBody>,
) -> Result<Json<ApiResponse<MembershipDetail>>> {
    let status = body.status()?;

    let detail = state.memberships.set_status(id, status).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 周期摘要
///
/// GET /api/memberships/{id}/summary?active_only=
pub async fn cycle_summary<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Path(id): Path<i64>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<CycleSummary>>> {
    let summary = state.query.cycle_summary(id, query.active_only).await?;
    Ok(Json(ApiResponse::success(summary)))
}
