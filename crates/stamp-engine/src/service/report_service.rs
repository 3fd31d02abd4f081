//! 报表服务
//!
//! 会员概览、奖励使用和交易汇总，仅输出统计数据

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use crate::error::Result;
use crate::models::{
    DateRange, MembershipStatus, RewardReport, RewardType, SummaryReport, TransactionReport,
};
use crate::repository::ReportRepositoryTrait;

/// 报表服务
pub struct ReportService<R: ReportRepositoryTrait> {
    repo: Arc<R>,
}

impl<R: ReportRepositoryTrait> ReportService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 会员概览：区间内创建的有效/过期会员数，区间内核销的奖励数
    #[instrument(skip(self))]
    pub async fn summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<SummaryReport> {
        let range = DateRange::new(from, to)?;
        Ok(SummaryReport {
            active_members: self
                .repo
                .count_memberships(&range, MembershipStatus::Active)
                .await?,
            expired_members: self
                .repo
                .count_memberships(&range, MembershipStatus::Expired)
                .await?,
            free_drink_used: self
                .repo
                .count_redeemed(&range, RewardType::FreeDrink)
                .await?,
            voucher_used: self
                .repo
                .count_redeemed(&range, RewardType::Voucher50k)
                .await?,
        })
    }

    /// 奖励使用情况：已核销按核销日期，未核销按获得日期
    #[instrument(skip(self))]
    pub async fn rewards(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<RewardReport> {
        let range = DateRange::new(from, to)?;
        Ok(RewardReport {
            free_drink_used: self
                .repo
                .count_redeemed(&range, RewardType::FreeDrink)
                .await?,
            free_drink_unused: self
                .repo
                .count_unredeemed(&range, RewardType::FreeDrink)
                .await?,
            voucher_used: self
                .repo
                .count_redeemed(&range, RewardType::Voucher50k)
                .await?,
            voucher_unused: self
                .repo
                .count_unredeemed(&range, RewardType::Voucher50k)
                .await?,
        })
    }

    /// 交易汇总：带交易金额的印花笔数与金额，含按日明细
    #[instrument(skip(self))]
    pub async fn transactions(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<TransactionReport> {
        let range = DateRange::new(from, to)?;
        let daily = self.repo.daily_transactions(&range).await?;
        Ok(TransactionReport::from_daily(daily))
    }
}
