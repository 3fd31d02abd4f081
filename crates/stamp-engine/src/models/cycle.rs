//! 集点周期与印花实体定义

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::RewardType;

/// 每个周期的印花格数
pub const CYCLE_SIZE: i32 = 10;

/// 交易金额上限，对应 `stamps.transaction_amount NUMERIC(12, 2)`：9_999_999_999.99
pub const MAX_TRANSACTION_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// 集点周期
///
/// cycle_number 在会员内从 1 开始递增且唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StampCycle {
    pub id: i64,
    pub membership_id: i64,
    pub cycle_number: i32,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 印花
///
/// number 取值 1..=10，在周期内唯一；redeemed_at 为空表示未核销
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    pub id: i64,
    pub cycle_id: i64,
    pub number: i32,
    pub reward_type: RewardType,
    #[sqlx(default)]
    pub redeemed_at: Option<DateTime<Utc>>,
    /// POS 小票号（全局唯一，用于防重复提交）
    #[sqlx(default)]
    pub pos_receipt_number: Option<String>,
    #[sqlx(default)]
    pub transaction_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建印花
#[derive(Debug, Clone)]
pub struct NewStamp {
    pub cycle_id: i64,
    pub number: i32,
    pub reward_type: RewardType,
    pub pos_receipt_number: Option<String>,
    pub transaction_amount: Option<Decimal>,
}

/// 周期摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSummary {
    pub membership_id: i64,
    /// 没有任何周期时为空
    pub cycle_number: Option<i32>,
    pub stamp_count: i64,
    pub is_full: bool,
}

impl CycleSummary {
    pub fn new(membership_id: i64, cycle_number: i32, stamp_count: i64) -> Self {
        Self {
            membership_id,
            cycle_number: Some(cycle_number),
            stamp_count,
            is_full: stamp_count >= i64::from(CYCLE_SIZE),
        }
    }

    /// 会员尚无周期
    pub fn empty(membership_id: i64) -> Self {
        Self {
            membership_id,
            cycle_number: None,
            stamp_count: 0,
            is_full: false,
        }
    }
}

/// 周期及其印花（升序）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleWithStamps {
    #[serde(flatten)]
    pub cycle: StampCycle,
    pub stamp_count: i64,
    pub is_full: bool,
    pub stamps: Vec<Stamp>,
}

impl CycleWithStamps {
    pub fn new(cycle: StampCycle, stamps: Vec<Stamp>) -> Self {
        let stamp_count = stamps.len() as i64;
        Self {
            cycle,
            stamp_count,
            is_full: stamp_count >= i64::from(CYCLE_SIZE),
            stamps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_transaction_amount() {
        assert_eq!(MAX_TRANSACTION_AMOUNT.to_string(), "9999999999.99");
        assert_eq!(MAX_TRANSACTION_AMOUNT.scale(), 2);
    }

    #[test]
    fn test_cycle_summary_full_at_ten() {
        assert!(!CycleSummary::new(7, 1, 9).is_full);
        assert!(CycleSummary::new(7, 1, 10).is_full);
    }

    #[test]
    fn test_empty_summary_serialization() {
        let json = serde_json::to_value(CycleSummary::empty(7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "membershipId": 7,
                "cycleNumber": null,
                "stampCount": 0,
                "isFull": false
            })
        );
    }
}
