//! 会员卡服务
//!
//! 发卡、查卡和换卡。换卡时解绑旧卡（如有），绑定指定卡片或自动生成的新卡，
//! 并同步会员上的卡号。

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use stamp_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{
    CardSelector, MembershipCard, MembershipDetail, generate_card_number, local_today,
};
use crate::repository::{LoyaltyStore, LoyaltyTx};
use crate::service::dto::ReplaceCardRequest;
use crate::service::ledger;

/// 生成卡号的最大尝试次数
const MAX_CARD_NUMBER_ATTEMPTS: usize = 16;

/// 会员卡服务
pub struct CardService<S: LoyaltyStore> {
    store: Arc<S>,
}

impl<S: LoyaltyStore> CardService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 发行一张未绑定的新卡
    ///
    /// 未指定卡号时自动生成；指定卡号已存在时返回 `CardNumberTaken`
    #[instrument(skip(self))]
    pub async fn issue_card(&self, card_number: Option<String>) -> Result<MembershipCard> {
        let requested = card_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut tx = self.store.begin().await?;
        let number = match requested {
            Some(number) => {
                if tx.card_number_exists(&number).await? {
                    return Err(LoyaltyError::CardNumberTaken(number));
                }
                number
            }
            None => Self::generate_unique_card_number(&mut tx).await?,
        };

        let card = tx.insert_card(&number).await?;
        tx.commit().await?;

        info!(card_id = card.id, card_number = %card.card_number, "发卡成功");
        Ok(card)
    }

    /// 按卡号或 public_id 查询卡片
    #[instrument(skip(self))]
    pub async fn get_card(
        &self,
        card_number: Option<&str>,
        public_id: Option<Uuid>,
    ) -> Result<MembershipCard> {
        let selector = CardSelector::from_parts(card_number, public_id)?
            .ok_or(LoyaltyError::MissingRequiredField("card_number"))?;

        let mut tx = self.store.begin().await?;
        let card = tx.find_card(&selector).await?;
        card.ok_or_else(|| LoyaltyError::CardNotFound(selector.to_string()))
    }

    /// 换卡
    ///
    /// 会员没有旧卡时跳过解绑；指定的卡片已绑定到本会员时不做任何变更
    #[instrument(
        skip(self, request),
        fields(membership_id = request.membership_id, card_number = ?request.card_number)
    )]
    pub async fn replace_card(&self, request: ReplaceCardRequest) -> Result<MembershipDetail> {
        let selector =
            CardSelector::from_parts(request.card_number.as_deref(), request.public_id)?;

        let mut tx = self.store.begin().await?;
        let membership = tx
            .lock_membership(request.membership_id)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(request.membership_id.to_string()))?;

        let old_card = tx.find_card_by_membership(membership.id).await?;
        let generated = selector.is_none();

        let new_card = match selector {
            Some(selector) => {
                let card = tx
                    .lock_card(&selector)
                    .await?
                    .ok_or_else(|| LoyaltyError::CardNotFound(selector.to_string()))?;

                if card.membership_id == Some(membership.id) {
                    info!(card_number = %card.card_number, "卡片已绑定到该会员，无需更换");
                    let detail = ledger::load_detail(&mut tx, membership, local_today()).await?;
                    return Ok(detail);
                }
                if !card.is_available() {
                    warn!(card_number = %card.card_number, "新卡已被其他会员绑定");
                    return Err(LoyaltyError::CardAlreadyAssigned(card.card_number));
                }
                card
            }
            None => {
                let number = Self::generate_unique_card_number(&mut tx).await?;
                tx.insert_card(&number).await?
            }
        };

        if let Some(ref old) = old_card {
            tx.unbind_card(old.id).await?;
        }
        tx.bind_card(new_card.id, membership.id).await?;
        tx.update_membership_card_number(membership.id, &new_card.card_number)
            .await?;

        let membership = tx
            .get_membership(membership.id)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(membership.id.to_string()))?;
        let detail = ledger::load_detail(&mut tx, membership, local_today()).await?;
        tx.commit().await?;

        metrics::record_card_replaced(generated);
        info!(
            old_card = ?old_card.map(|c| c.card_number),
            new_card = %new_card.card_number,
            generated = generated,
            "换卡成功"
        );

        Ok(detail)
    }

    // ==================== 私有方法 ====================

    /// 生成未被占用的卡号，冲突时重新生成
    async fn generate_unique_card_number(tx: &mut S::Tx) -> Result<String> {
        for _ in 0..MAX_CARD_NUMBER_ATTEMPTS {
            let candidate = generate_card_number();
            if !tx.card_number_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(LoyaltyError::Internal("无法生成唯一卡号".to_string()))
    }
}
