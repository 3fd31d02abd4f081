//! 会员查询服务
//!
//! 会员查找、历史明细和周期摘要。读取会员前执行惰性过期检查，状态变更随之提交。

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{LoyaltyError, Result};
use crate::models::{CardSelector, CycleSummary, Membership, MembershipDetail, local_today};
use crate::repository::{LoyaltyStore, LoyaltyTx};
use crate::service::ledger;

/// 会员查询服务
pub struct QueryService<S: LoyaltyStore> {
    store: Arc<S>,
}

impl<S: LoyaltyStore> QueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 按卡号、手机号或卡片 public_id 查找会员
    ///
    /// 标识会先去除首尾空白和 `/`（扫码枪常带出的 URL 片段），然后依次尝试：
    /// 卡号（不区分大小写）、顾客手机号（取最近开始的会员）、卡片 public_id。
    #[instrument(skip(self))]
    pub async fn lookup(&self, identifier: &str) -> Result<MembershipDetail> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() {
            return Err(LoyaltyError::MissingRequiredField("q"));
        }

        let mut tx = self.store.begin().await?;
        let membership = Self::find_membership(&mut tx, identifier)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(identifier.to_string()))?;

        let detail = Self::refresh_and_load(&mut tx, membership).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// 会员历史：会员、顾客、周期及印花
    #[instrument(skip(self))]
    pub async fn history(&self, membership_id: i64) -> Result<MembershipDetail> {
        let mut tx = self.store.begin().await?;
        let membership = tx
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(membership_id.to_string()))?;

        let detail = Self::refresh_and_load(&mut tx, membership).await?;
        tx.commit().await?;
        Ok(detail)
    }

    /// 周期摘要
    #[instrument(skip(self))]
    pub async fn cycle_summary(
        &self,
        membership_id: i64,
        active_only: bool,
    ) -> Result<CycleSummary> {
        let mut tx = self.store.begin().await?;
        if tx.get_membership(membership_id).await?.is_none() {
            return Err(LoyaltyError::MembershipNotFound(membership_id.to_string()));
        }
        ledger::cycle_summary(&mut tx, membership_id, active_only).await
    }

    // ==================== 私有方法 ====================

    async fn find_membership(tx: &mut S::Tx, identifier: &str) -> Result<Option<Membership>> {
        if let Some(membership) = tx.find_membership_by_card_number(identifier).await? {
            debug!("按卡号命中会员");
            return Ok(Some(membership));
        }

        if let Some(membership) = tx.find_latest_membership_by_phone(identifier).await? {
            debug!("按手机号命中会员");
            return Ok(Some(membership));
        }

        if let Some(selector @ CardSelector::PublicId(_)) = CardSelector::parse(identifier)
            && let Some(card) = tx.find_card(&selector).await?
            && let Some(membership_id) = card.membership_id
        {
            debug!("按卡片 public_id 命中会员");
            return tx.get_membership(membership_id).await;
        }

        Ok(None)
    }

    async fn refresh_and_load(
        tx: &mut S::Tx,
        mut membership: Membership,
    ) -> Result<MembershipDetail> {
        let today = local_today();
        ledger::refresh_membership_status(tx, &mut membership, today).await?;
        ledger::load_detail(tx, membership, today).await
    }
}

/// 去除查找标识首尾的空白和 `/`
pub fn normalize_identifier(identifier: &str) -> &str {
    identifier.trim_matches(|c: char| c.is_whitespace() || c == '/')
}
