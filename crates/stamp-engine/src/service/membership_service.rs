//! 会员服务
//!
//! 开卡（绑定实体卡并创建会员）和管理员冻结/解冻。
//! 开卡的全部步骤（顾客查找或创建、创建会员、绑卡、创建首个周期和首枚印花）
//! 在同一事务内完成，任一步失败整体回滚。

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use stamp_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{
    CardSelector, Customer, Membership, MembershipCard, MembershipDetail, MembershipStatus,
    NewCustomer, NewMembership, local_today,
};
use crate::repository::{LoyaltyStore, LoyaltyTx};
use crate::service::dto::ActivateCardRequest;
use crate::service::ledger;

/// 会员服务
pub struct MembershipService<S: LoyaltyStore> {
    store: Arc<S>,
}

impl<S: LoyaltyStore> MembershipService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 开卡
    ///
    /// 首枚印花在开卡时无条件赠送，奖励为周期第 1 格的配置。
    #[instrument(
        skip(self, request),
        fields(card_number = ?request.card_number, public_id = ?request.public_id)
    )]
    pub async fn activate_card(&self, request: ActivateCardRequest) -> Result<MembershipDetail> {
        let card_number = request
            .card_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if card_number.is_none() && request.public_id.is_none() {
            return Err(LoyaltyError::MissingRequiredField("card_number"));
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(LoyaltyError::MissingRequiredField("name"));
        }
        let phone = request.phone.trim();
        if phone.is_empty() {
            return Err(LoyaltyError::MissingRequiredField("phone"));
        }
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut tx = self.store.begin().await?;
        let settings = tx.load_settings().await?;

        let card = Self::resolve_card(&mut tx, card_number, request.public_id).await?;
        if !card.is_available() {
            warn!(card_number = %card.card_number, "会员卡已被绑定");
            return Err(LoyaltyError::CardAlreadyAssigned(card.card_number));
        }

        let customer = Self::find_or_create_customer(&mut tx, name, phone, email).await?;

        let today = local_today();
        let membership = tx
            .insert_membership(&NewMembership {
                customer_id: customer.id,
                card_number: card.card_number.clone(),
                start_date: today,
                end_date: Membership::compute_end_date(today, settings.membership_duration_months),
            })
            .await?;

        tx.bind_card(card.id, membership.id).await?;
        ledger::append_stamp(&mut tx, membership.id, &settings, None, None).await?;

        let detail = ledger::load_detail(&mut tx, membership, today).await?;
        tx.commit().await?;

        metrics::record_card_activated();
        info!(
            membership_id = detail.membership.id,
            customer_id = detail.customer.id,
            card_number = %detail.membership.card_number,
            end_date = %detail.membership.end_date,
            "开卡成功"
        );

        Ok(detail)
    }

    /// 冻结 / 解冻会员
    ///
    /// 只接受 `Active` 和 `Blocked`；解冻后立即执行过期检查。
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        membership_id: i64,
        status: MembershipStatus,
    ) -> Result<MembershipDetail> {
        if status == MembershipStatus::Expired {
            return Err(LoyaltyError::Validation(
                "会员状态只能设置为 active 或 blocked".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut membership = tx
            .lock_membership(membership_id)
            .await?
            .ok_or_else(|| LoyaltyError::MembershipNotFound(membership_id.to_string()))?;

        let previous = membership.status;
        if previous != status {
            tx.update_membership_status(membership.id, status).await?;
            membership.status = status;
        }

        let today = local_today();
        ledger::refresh_membership_status(&mut tx, &mut membership, today).await?;

        let detail = ledger::load_detail(&mut tx, membership, today).await?;
        tx.commit().await?;

        info!(
            from = previous.as_str(),
            to = detail.membership.status.as_str(),
            "会员状态已更新"
        );
        Ok(detail)
    }

    // ==================== 私有方法 ====================

    /// 定位并锁定待绑定的卡片：先按卡号，找不到再按 public_id
    async fn resolve_card(
        tx: &mut S::Tx,
        card_number: Option<&str>,
        public_id: Option<uuid::Uuid>,
    ) -> Result<MembershipCard> {
        if let Some(number) = card_number
            && let Some(card) = tx
                .lock_card(&CardSelector::CardNumber(number.to_string()))
                .await?
        {
            return Ok(card);
        }

        if let Some(id) = public_id
            && let Some(card) = tx.lock_card(&CardSelector::PublicId(id)).await?
        {
            return Ok(card);
        }

        let identifier = card_number
            .map(str::to_string)
            .or_else(|| public_id.map(|id| id.to_string()))
            .unwrap_or_default();
        Err(LoyaltyError::CardNotFound(identifier))
    }

    /// 按手机号查找顾客，不存在则创建；已存在时只补全空缺的姓名和邮箱
    ///
    /// 同一新手机号被并发开卡时，插入落败的一方重新读取并锁定对方刚提交的顾客
    async fn find_or_create_customer(
        tx: &mut S::Tx,
        name: &str,
        phone: &str,
        email: Option<&str>,
    ) -> Result<Customer> {
        let existing = match tx.lock_customer_by_phone(phone).await? {
            Some(customer) => customer,
            None => {
                let inserted = tx
                    .insert_customer(&NewCustomer {
                        name: name.to_string(),
                        phone: phone.to_string(),
                        email: email.map(str::to_string),
                    })
                    .await?;
                if let Some(customer) = inserted {
                    return Ok(customer);
                }

                debug!(phone = %phone, "顾客已由并发请求创建，重新读取");
                tx.lock_customer_by_phone(phone).await?.ok_or_else(|| {
                    LoyaltyError::Internal(format!("手机号 {} 的顾客插入冲突后不存在", phone))
                })?
            }
        };

        Self::backfill_customer(tx, existing, name, email).await
    }

    async fn backfill_customer(
        tx: &mut S::Tx,
        mut customer: Customer,
        name: &str,
        email: Option<&str>,
    ) -> Result<Customer> {
        if let Some((new_name, new_email)) = customer.backfill(name, email) {
            tx.update_customer_contact(customer.id, &new_name, new_email.as_deref())
                .await?;
            customer.name = new_name;
            customer.email = new_email;
        }
        Ok(customer)
    }
}
