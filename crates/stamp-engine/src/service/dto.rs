//! 服务层请求结构

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LoyaltyError, Result};
use crate::models::MAX_TRANSACTION_AMOUNT;

/// 交易印花请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardStampRequest {
    pub membership_id: i64,
    pub transaction_amount: Decimal,
    /// POS 小票号，提供时用于防重复提交
    pub pos_receipt_number: Option<String>,
}

impl AwardStampRequest {
    pub fn new(membership_id: i64, transaction_amount: Decimal) -> Self {
        Self {
            membership_id,
            transaction_amount,
            pos_receipt_number: None,
        }
    }

    pub fn with_receipt(mut self, receipt: impl Into<String>) -> Self {
        self.pos_receipt_number = Some(receipt.into());
        self
    }

    /// 金额须在 [0, MAX_TRANSACTION_AMOUNT] 内
    pub(crate) fn validate_amount(&self) -> Result<()> {
        let amount = self.transaction_amount;
        if amount < Decimal::ZERO {
            return Err(LoyaltyError::Validation(format!("交易金额不能为负数: {}", amount)));
        }
        if amount > MAX_TRANSACTION_AMOUNT {
            return Err(LoyaltyError::Validation(format!(
                "交易金额超过上限 {}: {}",
                MAX_TRANSACTION_AMOUNT, amount
            )));
        }
        Ok(())
    }

    /// 规范化小票号：去除首尾空白，空串视为未提供
    pub(crate) fn normalized_receipt(&self) -> Option<String> {
        self.pos_receipt_number
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

/// 开卡请求
///
/// 优先按卡号查找卡片，找不到时再按 public_id 查找
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateCardRequest {
    pub card_number: Option<String>,
    pub public_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// 换卡请求
///
/// 卡号和 public_id 至多提供一个；都不提供时自动生成新卡
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCardRequest {
    pub membership_id: i64,
    pub card_number: Option<String>,
    pub public_id: Option<Uuid>,
}
