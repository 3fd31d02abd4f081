//! 印花发放服务
//!
//! 处理交易印花发放的核心业务逻辑，包括：
//! - 会员有效性检查（惰性过期）
//! - 金额门槛检查
//! - 小票号防重
//! - 周期滚动与奖励位置判定
//!
//! ## 发放流程
//!
//! 1. 锁定会员 -> 2. 刷新状态 -> 3. 有效性检查 -> 4. 门槛检查
//!    -> 5. 小票防重 -> 6. 追加印花（必要时关闭/开启周期）-> 7. 提交
//!
//! 整个流程在一个事务内执行，会员行锁保证同一会员的并发发放串行化。

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use stamp_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{Stamp, local_today};
use crate::repository::{LoyaltyStore, LoyaltyTx};
use crate::service::dto::AwardStampRequest;
use crate::service::ledger;

/// 未发放印花的原因（指标标签）
mod skip_reason {
    pub const INACTIVE: &str = "inactive";
    pub const BELOW_THRESHOLD: &str = "below_threshold";
}

/// 印花发放服务
pub struct StampAwardService<S: LoyaltyStore> {
    store: Arc<S>,
}

impl<S: LoyaltyStore> StampAwardService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 为一笔交易发放印花
    ///
    /// 会员无效或金额未达门槛时返回 `Ok(None)`，不视为错误。
    /// 会员因过期被刷新为 `Expired` 时，状态变更随事务提交。
    #[instrument(
        skip(self, request),
        fields(
            membership_id = request.membership_id,
            amount = %request.transaction_amount,
            receipt = ?request.pos_receipt_number
        )
    )]
    pub async fn award_stamp(&self, request: AwardStampRequest) -> Result<Option<Stamp>> {
        let started = Instant::now();
        request.validate_amount()?;
        let receipt = request.normalized_receipt();

        let mut tx = self.store.begin().await?;
        let settings = tx.load_settings().await?;

        let mut membership = tx
            .lock_membership(request.membership_id)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(request.membership_id.to_string()))?;

        let today = local_today();
        ledger::refresh_membership_status(&mut tx, &mut membership, today).await?;

        if !membership.is_active_on(today) {
            tx.commit().await?;
            info!(
                status = membership.status.as_str(),
                start_date = %membership.start_date,
                end_date = %membership.end_date,
                "会员不在有效期内，不发放印花"
            );
            metrics::record_stamp_skipped(skip_reason::INACTIVE);
            return Ok(None);
        }

        if !settings.qualifies_for_stamp(request.transaction_amount) {
            info!(
                min_amount = %settings.min_amount_for_stamp,
                "交易金额未达门槛，不发放印花"
            );
            metrics::record_stamp_skipped(skip_reason::BELOW_THRESHOLD);
            return Ok(None);
        }

        if let Some(ref receipt) = receipt
            && tx.receipt_exists(receipt).await?
        {
            warn!(receipt = %receipt, "小票号已使用，拒绝重复发放");
            return Err(LoyaltyError::DuplicateReceipt(receipt.clone()));
        }

        let stamp = ledger::append_stamp(
            &mut tx,
            membership.id,
            &settings,
            receipt,
            Some(request.transaction_amount),
        )
        .await?;

        tx.commit().await?;

        metrics::record_stamp_awarded(
            stamp.reward_type.as_str(),
            started.elapsed().as_secs_f64(),
        );
        info!(
            stamp_id = stamp.id,
            number = stamp.number,
            reward_type = %stamp.reward_type,
            "印花发放成功"
        );

        Ok(Some(stamp))
    }
}
