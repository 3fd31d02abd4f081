//! 会员卡 API 处理器

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use validator::Validate;

use stamp_engine::models::MembershipCard;

use crate::{
    dto::{ApiResponse, CardLookupQuery, IssueCardBody},
    error::Result,
    state::{AppState, LoyaltyBackend, ReportBackend},
};

/// 发卡
///
/// POST /api/cards
pub async fn issue_card<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Json(body): Json<IssueCardBody>,
) -> Result<(StatusCode, Json<ApiResponse<MembershipCard>>)> {
    body.validate()?;

    let card = state.cards.issue_card(body.card_number).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(card))))
}

/// 按卡号或卡片 ID 查卡
///
/// GET /api/cards/lookup?card_number=&public_id=
pub async fn get_card<S: LoyaltyBackend, R: ReportBackend>(
    State(state): State<AppState<S, R>>,
    Query(query): Query<CardLookupQuery>,
) -> Result<Json<ApiResponse<MembershipCard>>> {
    let card = state
        .cards
        .get_card(query.card_number.as_deref(), query.public_id)
        .await?;
    Ok(Json(ApiResponse::success(card)))
}
