//! 集点计划参数

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stamp_shared::config::ProgramConfig;

use super::cycle::CYCLE_SIZE;
use super::enums::RewardType;
use crate::error::{LoyaltyError, Result};

/// 集点计划参数（单行记录，id 固定为 1）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSettings {
    pub membership_fee: Decimal,
    pub membership_duration_months: i32,
    pub discount_percent: i32,
    /// 单笔交易获得印花的最低金额
    pub min_amount_for_stamp: Decimal,
    /// 周期第 1 枚印花的奖励
    pub reward_stamp_1_type: RewardType,
    /// 周期第 10 枚印花的奖励
    pub reward_stamp_10_type: RewardType,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgramSettings {
    /// 印花位置对应的奖励
    pub fn reward_for_position(&self, number: i32) -> RewardType {
        match number {
            1 => self.reward_stamp_1_type,
            CYCLE_SIZE => self.reward_stamp_10_type,
            _ => RewardType::None,
        }
    }

    /// 交易金额是否达到印花门槛
    pub fn qualifies_for_stamp(&self, amount: Decimal) -> bool {
        amount >= self.min_amount_for_stamp
    }

    /// 应用部分更新并校验
    pub fn apply(&mut self, patch: &SettingsPatch) -> Result<()> {
        if let Some(fee) = patch.membership_fee {
            self.membership_fee = fee;
        }
        if let Some(months) = patch.membership_duration_months {
            self.membership_duration_months = months;
        }
        if let Some(percent) = patch.discount_percent {
            self.discount_percent = percent;
        }
        if let Some(min_amount) = patch.min_amount_for_stamp {
            self.min_amount_for_stamp = min_amount;
        }
        if let Some(reward) = patch.reward_stamp_1_type {
            self.reward_stamp_1_type = reward;
        }
        if let Some(reward) = patch.reward_stamp_10_type {
            self.reward_stamp_10_type = reward;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.membership_duration_months < 1 {
            return Err(LoyaltyError::Validation(
                "会员有效期至少为 1 个月".to_string(),
            ));
        }
        if !(0..=100).contains(&self.discount_percent) {
            return Err(LoyaltyError::Validation(
                "折扣百分比必须在 0 到 100 之间".to_string(),
            ));
        }
        if self.membership_fee.is_sign_negative() || self.min_amount_for_stamp.is_sign_negative() {
            return Err(LoyaltyError::Validation("金额不能为负数".to_string()));
        }
        Ok(())
    }
}

impl TryFrom<&ProgramConfig> for ProgramSettings {
    type Error = LoyaltyError;

    fn try_from(config: &ProgramConfig) -> Result<Self> {
        let settings = Self {
            membership_fee: Decimal::from(config.membership_fee),
            membership_duration_months: config.membership_duration_months,
            discount_percent: config.discount_percent,
            min_amount_for_stamp: Decimal::from(config.min_amount_for_stamp),
            reward_stamp_1_type: config.reward_stamp_1_type.parse()?,
            reward_stamp_10_type: config.reward_stamp_10_type.parse()?,
            updated_at: None,
        };
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self {
            membership_fee: Decimal::from(25_000),
            membership_duration_months: 3,
            discount_percent: 10,
            min_amount_for_stamp: Decimal::from(50_000),
            reward_stamp_1_type: RewardType::FreeDrink,
            reward_stamp_10_type: RewardType::Voucher50k,
            updated_at: None,
        }
    }
}

/// 参数部分更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub membership_fee: Option<Decimal>,
    pub membership_duration_months: Option<i32>,
    pub discount_percent: Option<i32>,
    pub min_amount_for_stamp: Option<Decimal>,
    pub reward_stamp_1_type: Option<RewardType>,
    pub reward_stamp_10_type: Option<RewardType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_for_position() {
        let settings = ProgramSettings::default();
        assert_eq!(settings.reward_for_position(1), RewardType::FreeDrink);
        assert_eq!(settings.reward_for_position(10), RewardType::Voucher50k);
        for n in 2..=9 {
            assert_eq!(settings.reward_for_position(n), RewardType::None);
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let settings = ProgramSettings::default();
        assert!(settings.qualifies_for_stamp(Decimal::from(50_000)));
        assert!(!settings.qualifies_for_stamp(Decimal::new(4_999_999, 2)));
    }

    #[test]
    fn test_from_program_config() {
        let settings = ProgramSettings::try_from(&ProgramConfig::default()).unwrap();
        assert_eq!(settings, ProgramSettings::default());

        let bad = ProgramConfig {
            reward_stamp_10_type: "voucher_100k".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ProgramSettings::try_from(&bad),
            Err(LoyaltyError::InvalidRewardType(_))
        ));
    }

    #[test]
    fn test_apply_patch_validates() {
        let mut settings = ProgramSettings::default();
        settings
            .apply(&SettingsPatch {
                discount_percent: Some(15),
                reward_stamp_1_type: Some(RewardType::None),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(settings.discount_percent, 15);
        assert_eq!(settings.reward_for_position(1), RewardType::None);

        let err = settings
            .apply(&SettingsPatch {
                membership_duration_months: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::Validation(_)));

        let mut settings = ProgramSettings::default();
        assert!(settings
            .apply(&SettingsPatch {
                discount_percent: Some(101),
                ..Default::default()
            })
            .is_err());
    }
}
