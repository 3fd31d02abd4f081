//! 统计报表模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LoyaltyError, Result};

/// 报表日期区间（闭区间，两端可选）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        if let (Some(from), Some(to)) = (from, to)
            && from > to
        {
            return Err(LoyaltyError::Validation(format!(
                "起始日期 {} 晚于结束日期 {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// 日期是否落在区间内
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// 会员与核销概览
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub active_members: i64,
    pub expired_members: i64,
    pub free_drink_used: i64,
    pub voucher_used: i64,
}

/// 奖励使用情况
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardReport {
    pub free_drink_used: i64,
    pub free_drink_unused: i64,
    pub voucher_used: i64,
    pub voucher_unused: i64,
}

/// 单日交易汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyTransactions {
    pub date: NaiveDate,
    pub transaction_count: i64,
    pub total_amount: Decimal,
}

/// 交易报表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReport {
    pub transaction_count: i64,
    pub total_amount: Decimal,
    pub daily: Vec<DailyTransactions>,
}

impl TransactionReport {
    /// 由按日汇总数据计算总计
    pub fn from_daily(daily: Vec<DailyTransactions>) -> Self {
        let transaction_count = daily.iter().map(|d| d.transaction_count).sum();
        let total_amount = daily.iter().map(|d| d.total_amount).sum();
        Self {
            transaction_count,
            total_amount,
            daily,
        }
    }
}
