//! 集点引擎枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoyaltyError;

/// 会员状态
///
/// `Expired` 由读取时的惰性检查写入，`Blocked` 只能由管理员解除
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum MembershipStatus {
    /// 有效
    #[default]
    Active,
    /// 已过期 - 超过 end_date
    Expired,
    /// 已冻结 - 不会自动变更
    Blocked,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Blocked => "blocked",
        }
    }
}

/// 奖励类型
///
/// 印花在周期中的位置决定其奖励，`None` 为普通印花
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum RewardType {
    /// 无奖励
    #[default]
    None,
    /// 免费饮品
    FreeDrink,
    /// 50k 代金券
    #[serde(rename = "voucher_50k")]
    #[sqlx(rename = "voucher_50k")]
    Voucher50k,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::FreeDrink => "free_drink",
            Self::Voucher50k => "voucher_50k",
        }
    }

    /// 是否携带奖励
    pub fn is_reward(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardType {
    type Err = LoyaltyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(Self::None),
            "free_drink" => Ok(Self::FreeDrink),
            "voucher_50k" => Ok(Self::Voucher50k),
            other => Err(LoyaltyError::InvalidRewardType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_type_serde() {
        assert_eq!(
            serde_json::to_string(&RewardType::Voucher50k).unwrap(),
            "\"voucher_50k\""
        );
        assert_eq!(
            serde_json::to_string(&RewardType::FreeDrink).unwrap(),
            "\"free_drink\""
        );
        let parsed: RewardType = serde_json::from_str("\"voucher_50k\"").unwrap();
        assert_eq!(parsed, RewardType::Voucher50k);
    }

    #[test]
    fn test_reward_type_from_str() {
        assert_eq!("free_drink".parse::<RewardType>().unwrap(), RewardType::FreeDrink);
        assert_eq!("none".parse::<RewardType>().unwrap(), RewardType::None);
        assert!(matches!(
            "voucher_100k".parse::<RewardType>(),
            Err(LoyaltyError::InvalidRewardType(_))
        ));
    }

    #[test]
    fn test_is_reward() {
        assert!(!RewardType::None.is_reward());
        assert!(RewardType::FreeDrink.is_reward());
        assert!(RewardType::Voucher50k.is_reward());
    }

    #[test]
    fn test_membership_status_serde() {
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Blocked).unwrap(),
            "\"blocked\""
        );
        assert_eq!(MembershipStatus::Expired.as_str(), "expired");
    }
}
