//! 奖励核销服务
//!
//! 按最早获得优先的策略核销奖励印花：在会员的全部周期中选取指定奖励类型、
//! 尚未核销且 (cycle_number, number) 最小的一枚。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use stamp_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{RewardType, Stamp, local_today};
use crate::repository::{LoyaltyStore, LoyaltyTx};
use crate::service::ledger;

/// 奖励核销服务
pub struct RedemptionService<S: LoyaltyStore> {
    store: Arc<S>,
}

impl<S: LoyaltyStore> RedemptionService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 核销一枚奖励印花
    ///
    /// 没有可核销的奖励时返回 `Ok(None)`。核销只在 redeemed_at 为空时写入，
    /// 重复核销不会覆盖已有时间。
    #[instrument(skip(self), fields(reward_type = %reward_type))]
    pub async fn redeem(
        &self,
        membership_id: i64,
        reward_type: RewardType,
    ) -> Result<Option<Stamp>> {
        if !reward_type.is_reward() {
            return Err(LoyaltyError::InvalidRewardType(reward_type.to_string()));
        }

        let mut tx = self.store.begin().await?;
        let mut membership = tx
            .lock_membership(membership_id)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(membership_id.to_string()))?;
        ledger::refresh_membership_status(&mut tx, &mut membership, local_today()).await?;

        let Some(candidate) = tx.lock_oldest_unredeemed(membership.id, reward_type).await? else {
            tx.commit().await?;
            info!("没有可核销的奖励");
            return Ok(None);
        };

        let redeemed = tx.mark_redeemed(candidate.id, Utc::now()).await?;
        tx.commit().await?;

        if let Some(ref stamp) = redeemed {
            metrics::record_reward_redeemed(reward_type.as_str());
            info!(stamp_id = stamp.id, number = stamp.number, "奖励核销成功");
        }

        Ok(redeemed)
    }
}
