//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use stamp_engine::models::{MAX_TRANSACTION_AMOUNT, MembershipStatus, RewardType};
use stamp_engine::service::{ActivateCardRequest, AwardStampRequest, ReplaceCardRequest};

use crate::error::{AdminError, Result};

/// 金额最多两位小数
const AMOUNT_MAX_SCALE: u32 = 2;

/// 开卡请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActivateCardBody {
    #[validate(length(max = 64, message = "卡号长度不能超过64个字符"))]
    pub card_number: Option<String>,
    pub public_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 200, message = "姓名长度不能超过200个字符"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 32, message = "手机号长度不能超过32个字符"))]
    pub phone: String,
    #[validate(email(message = "邮箱格式无效"))]
    pub email: Option<String>,
}

impl From<ActivateCardBody> for ActivateCardRequest {
    fn from(body: ActivateCardBody) -> Self {
        Self {
            card_number: body.card_number,
            public_id: body.public_id,
            name: body.name,
            phone: body.phone,
            email: body.email.filter(|e| !e.trim().is_empty()),
        }
    }
}

/// 交易印花请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AwardStampBody {
    pub transaction_amount: Decimal,
    #[validate(length(max = 128, message = "小票号长度不能超过128个字符"))]
    pub pos_receipt_number: Option<String>,
}

impl AwardStampBody {
    /// 校验金额并转换为引擎请求
    ///
    /// 负数、超过上限或超过两位小数的金额视为格式错误；低于门槛的金额交由引擎判定
    pub fn into_request(self, membership_id: i64) -> Result<AwardStampRequest> {
        let amount = self.transaction_amount;
        if amount < Decimal::ZERO {
            return Err(AdminError::Validation("交易金额不能为负数".to_string()));
        }
        if amount > MAX_TRANSACTION_AMOUNT {
            return Err(AdminError::Validation(format!(
                "交易金额不能超过 {}",
                MAX_TRANSACTION_AMOUNT
            )));
        }
        if amount.normalize().scale() > AMOUNT_MAX_SCALE {
            return Err(AdminError::Validation(
                "交易金额最多保留两位小数".to_string(),
            ));
        }

        Ok(AwardStampRequest {
            membership_id,
            transaction_amount: amount,
            pos_receipt_number: self.pos_receipt_number,
        })
    }
}

/// 核销请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemBody {
    pub reward_type: String,
}

impl RedeemBody {
    /// 解析奖励类型，未知取值返回 `INVALID_REWARD_TYPE`
    pub fn reward_type(&self) -> Result<RewardType> {
        Ok(self.reward_type.trim().parse::<RewardType>()?)
    }
}

/// 换卡请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCardBody {
    #[validate(length(max = 64, message = "卡号长度不能超过64个字符"))]
    pub card_number: Option<String>,
    pub public_id: Option<Uuid>,
}

impl ReplaceCardBody {
    pub fn into_request(self, membership_id: i64) -> ReplaceCardRequest {
        ReplaceCardRequest {
            membership_id,
            card_number: self.card_number,
            public_id: self.public_id,
        }
    }
}

/// 会员状态变更请求
#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
    pub status: String,
}

impl SetStatusBody {
    /// 解析目标状态（是否允许由引擎判定）
    pub fn status(&self) -> Result<MembershipStatus> {
        let value = self.status.trim();
        [
            MembershipStatus::Active,
            MembershipStatus::Expired,
            MembershipStatus::Blocked,
        ]
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| AdminError::Validation(format!("无效的会员状态: {}", value)))
    }
}

/// 发卡请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueCardBody {
    #[validate(length(max = 64, message = "卡号长度不能超过64个字符"))]
    pub card_number: Option<String>,
}

/// 会员查找参数
#[derive(Debug, Default, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub q: String,
}

/// 周期摘要参数
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// 查卡参数
#[derive(Debug, Default, Deserialize)]
pub struct CardLookupQuery {
    pub card_number: Option<String>,
    pub public_id: Option<Uuid>,
}

/// 报表日期区间参数（闭区间）
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
