//! PostgreSQL 仓储实现
//!
//! 每个 [`PgLoyaltyTx`] 包装一个数据库事务，行锁通过 `SELECT ... FOR UPDATE` 获取

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::traits::{LoyaltyStore, LoyaltyTx, SettingsSource};
use crate::error::{LoyaltyError, Result};
use crate::models::{
    CardSelector, Customer, Membership, MembershipCard, MembershipStatus, NewCustomer,
    NewMembership, NewStamp, ProgramSettings, RewardType, SettingsPatch, Stamp, StampCycle,
};

const MEMBERSHIP_COLUMNS: &str =
    "m.id, m.customer_id, m.card_number, m.start_date, m.end_date, m.status, m.created_at, m.updated_at";

const CUSTOMER_COLUMNS: &str = "id, name, phone, email, created_at, updated_at";

const CARD_COLUMNS: &str =
    "id, public_id, card_number, is_assigned, membership_id, created_at, updated_at";

const CYCLE_COLUMNS: &str = "id, membership_id, cycle_number, is_closed, created_at, updated_at";

const STAMP_COLUMNS: &str = "s.id, s.cycle_id, s.number, s.reward_type, s.redeemed_at, \
     s.pos_receipt_number, s.transaction_amount, s.created_at, s.updated_at";

const SETTINGS_COLUMNS: &str = "membership_fee, membership_duration_months, discount_percent, \
     min_amount_for_stamp, reward_stamp_1_type, reward_stamp_10_type, updated_at";

/// 参数单行记录的固定主键
const SETTINGS_ROW_ID: i32 = 1;

/// PostgreSQL 事务工厂
#[derive(Clone)]
pub struct PgLoyaltyStore {
    pool: PgPool,
    /// 参数记录首次创建时使用的默认值
    defaults: ProgramSettings,
}

impl PgLoyaltyStore {
    pub fn new(pool: PgPool, defaults: ProgramSettings) -> Self {
        Self { pool, defaults }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LoyaltyStore for PgLoyaltyStore {
    type Tx = PgLoyaltyTx;

    async fn begin(&self) -> Result<PgLoyaltyTx> {
        let tx = self.pool.begin().await?;
        Ok(PgLoyaltyTx {
            tx,
            defaults: self.defaults.clone(),
        })
    }
}

#[async_trait]
impl SettingsSource for PgLoyaltyStore {
    async fn load(&self) -> Result<ProgramSettings> {
        let mut tx = self.begin().await?;
        let settings = tx.load_settings().await?;
        tx.commit().await?;
        Ok(settings)
    }

    async fn update(&self, patch: &SettingsPatch) -> Result<ProgramSettings> {
        let mut tx = self.begin().await?;
        let mut settings = tx.lock_settings().await?;
        settings.apply(patch)?;
        let saved = tx.save_settings(&settings).await?;
        tx.commit().await?;
        Ok(saved)
    }
}

/// PostgreSQL 事务
pub struct PgLoyaltyTx {
    tx: Transaction<'static, Postgres>,
    defaults: ProgramSettings,
}

impl PgLoyaltyTx {
    async fn fetch_settings(&mut self, for_update: bool) -> Result<Option<ProgramSettings>> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let sql = format!(
            "SELECT {} FROM program_settings WHERE id = $1{}",
            SETTINGS_COLUMNS, lock
        );
        let settings = sqlx::query_as::<_, ProgramSettings>(&sql)
            .bind(SETTINGS_ROW_ID)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(settings)
    }

    /// 参数行不存在时以默认值写入
    async fn seed_settings(&mut self) -> Result<()> {
        let defaults = self.defaults.clone();
        sqlx::query(
            r#"
            INSERT INTO program_settings (id, membership_fee, membership_duration_months,
                discount_percent, min_amount_for_stamp, reward_stamp_1_type, reward_stamp_10_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(SETTINGS_ROW_ID)
        .bind(defaults.membership_fee)
        .bind(defaults.membership_duration_months)
        .bind(defaults.discount_percent)
        .bind(defaults.min_amount_for_stamp)
        .bind(defaults.reward_stamp_1_type)
        .bind(defaults.reward_stamp_10_type)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn fetch_card(
        &mut self,
        selector: &CardSelector,
        for_update: bool,
    ) -> Result<Option<MembershipCard>> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let card = match selector {
            CardSelector::CardNumber(number) => {
                let sql = format!(
                    "SELECT {} FROM membership_cards WHERE card_number = $1{}",
                    CARD_COLUMNS, lock
                );
                sqlx::query_as::<_, MembershipCard>(&sql)
                    .bind(number)
                    .fetch_optional(&mut *self.tx)
                    .await?
            }
            CardSelector::PublicId(public_id) => {
                let sql = format!(
                    "SELECT {} FROM membership_cards WHERE public_id = $1{}",
                    CARD_COLUMNS, lock
                );
                sqlx::query_as::<_, MembershipCard>(&sql)
                    .bind(public_id)
                    .fetch_optional(&mut *self.tx)
                    .await?
            }
        };
        Ok(card)
    }

    async fn fetch_membership(&mut self, id: i64, for_update: bool) -> Result<Option<Membership>> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let sql = format!(
            "SELECT {} FROM memberships m WHERE m.id = $1{}",
            MEMBERSHIP_COLUMNS, lock
        );
        let membership = sqlx::query_as::<_, Membership>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(membership)
    }
}

#[async_trait]
impl LoyaltyTx for PgLoyaltyTx {
    // ==================== 计划参数 ====================

    async fn load_settings(&mut self) -> Result<ProgramSettings> {
        if let Some(settings) = self.fetch_settings(false).await? {
            return Ok(settings);
        }

        self.seed_settings().await?;
        self.fetch_settings(false)
            .await?
            .ok_or_else(|| LoyaltyError::Internal("计划参数初始化失败".to_string()))
    }

    async fn lock_settings(&mut self) -> Result<ProgramSettings> {
        self.seed_settings().await?;
        self.fetch_settings(true)
            .await?
            .ok_or_else(|| LoyaltyError::Internal("计划参数初始化失败".to_string()))
    }

    async fn save_settings(&mut self, settings: &ProgramSettings) -> Result<ProgramSettings> {
        let sql = format!(
            r#"
            INSERT INTO program_settings (id, membership_fee, membership_duration_months,
                discount_percent, min_amount_for_stamp, reward_stamp_1_type, reward_stamp_10_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                membership_fee = EXCLUDED.membership_fee,
                membership_duration_months = EXCLUDED.membership_duration_months,
                discount_percent = EXCLUDED.discount_percent,
                min_amount_for_stamp = EXCLUDED.min_amount_for_stamp,
                reward_stamp_1_type = EXCLUDED.reward_stamp_1_type,
                reward_stamp_10_type = EXCLUDED.reward_stamp_10_type,
                updated_at = NOW()
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );
        let saved = sqlx::query_as::<_, ProgramSettings>(&sql)
            .bind(SETTINGS_ROW_ID)
            .bind(settings.membership_fee)
            .bind(settings.membership_duration_months)
            .bind(settings.discount_percent)
            .bind(settings.min_amount_for_stamp)
            .bind(settings.reward_stamp_1_type)
            .bind(settings.reward_stamp_10_type)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(saved)
    }

    // ==================== 会员 ====================

    async fn get_membership(&mut self, id: i64) -> Result<Option<Membership>> {
        self.fetch_membership(id, false).await
    }

    async fn lock_membership(&mut self, id: i64) -> Result<Option<Membership>> {
        self.fetch_membership(id, true).await
    }

    async fn find_membership_by_card_number(
        &mut self,
        card_number: &str,
    ) -> Result<Option<Membership>> {
        let sql = format!(
            "SELECT {} FROM memberships m WHERE LOWER(m.card_number) = LOWER($1) ORDER BY m.id LIMIT 1",
            MEMBERSHIP_COLUMNS
        );
        let membership = sqlx::query_as::<_, Membership>(&sql)
            .bind(card_number)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(membership)
    }

    async fn find_latest_membership_by_phone(
        &mut self,
        phone: &str,
    ) -> Result<Option<Membership>> {
        let sql = format!(
            r#"
            SELECT {} FROM memberships m
            JOIN customers c ON c.id = m.customer_id
            WHERE c.phone = $1
            ORDER BY m.start_date DESC, m.id DESC
            LIMIT 1
            "#,
            MEMBERSHIP_COLUMNS
        );
        let membership = sqlx::query_as::<_, Membership>(&sql)
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(membership)
    }

    async fn insert_membership(&mut self, new: &NewMembership) -> Result<Membership> {
        let sql = format!(
            r#"
            INSERT INTO memberships AS m (customer_id, card_number, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MEMBERSHIP_COLUMNS
        );
        sqlx::query_as::<_, Membership>(&sql)
            .bind(new.customer_id)
            .bind(&new.card_number)
            .bind(new.start_date)
            .bind(new.end_date)
            .bind(MembershipStatus::Active)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| LoyaltyError::from_unique_violation(e, &new.card_number))
    }

    async fn update_membership_status(&mut self, id: i64, status: MembershipStatus) -> Result<()> {
        sqlx::query("UPDATE memberships SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_membership_card_number(&mut self, id: i64, card_number: &str) -> Result<()> {
        sqlx::query("UPDATE memberships SET card_number = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(card_number)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| LoyaltyError::from_unique_violation(e, card_number))?;
        Ok(())
    }

    // ==================== 顾客 ====================

    async fn get_customer(&mut self, id: i64) -> Result<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(customer)
    }

    async fn lock_customer_by_phone(&mut self, phone: &str) -> Result<Option<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers WHERE phone = $1 FOR UPDATE",
            CUSTOMER_COLUMNS
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(phone)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(customer)
    }

    async fn insert_customer(&mut self, new: &NewCustomer) -> Result<Option<Customer>> {
        // 并发插入同一手机号时，后到者在此等待先到者提交后什么也不做
        let sql = format!(
            "INSERT INTO customers (name, phone, email) VALUES ($1, $2, $3) \
             ON CONFLICT (phone) DO NOTHING RETURNING {}",
            CUSTOMER_COLUMNS
        );
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(&new.name)
            .bind(&new.phone)
            .bind(&new.email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(customer)
    }

    async fn update_customer_contact(
        &mut self,
        id: i64,
        name: &str,
        email: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE customers SET name = $2, email = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    // ==================== 会员卡 ====================

    async fn find_card(&mut self, selector: &CardSelector) -> Result<Option<MembershipCard>> {
        self.fetch_card(selector, false).await
    }

    async fn lock_card(&mut self, selector: &CardSelector) -> Result<Option<MembershipCard>> {
        self.fetch_card(selector, true).await
    }

    async fn find_card_by_membership(
        &mut self,
        membership_id: i64,
    ) -> Result<Option<MembershipCard>> {
        let sql = format!(
            "SELECT {} FROM membership_cards WHERE membership_id = $1",
            CARD_COLUMNS
        );
        let card = sqlx::query_as::<_, MembershipCard>(&sql)
            .bind(membership_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(card)
    }

    async fn card_number_exists(&mut self, card_number: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM membership_cards WHERE LOWER(card_number) = LOWER($1))
                OR EXISTS(SELECT 1 FROM memberships WHERE LOWER(card_number) = LOWER($1))
            "#,
        )
        .bind(card_number)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn insert_card(&mut self, card_number: &str) -> Result<MembershipCard> {
        let sql = format!(
            r#"
            INSERT INTO membership_cards (public_id, card_number, is_assigned)
            VALUES ($1, $2, FALSE)
            RETURNING {}
            "#,
            CARD_COLUMNS
        );
        sqlx::query_as::<_, MembershipCard>(&sql)
            .bind(Uuid::new_v4())
            .bind(card_number)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| LoyaltyError::from_unique_violation(e, card_number))
    }

    async fn bind_card(&mut self, card_id: i64, membership_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE membership_cards
            SET is_assigned = TRUE, membership_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(card_id)
        .bind(membership_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| LoyaltyError::from_unique_violation(e, &card_id.to_string()))?;
        Ok(())
    }

    async fn unbind_card(&mut self, card_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE membership_cards
            SET is_assigned = FALSE, membership_id = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(card_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    // ==================== 周期 ====================

    async fn list_cycles(&mut self, membership_id: i64) -> Result<Vec<StampCycle>> {
        let sql = format!(
            "SELECT {} FROM stamp_cycles WHERE membership_id = $1 ORDER BY cycle_number",
            CYCLE_COLUMNS
        );
        let cycles = sqlx::query_as::<_, StampCycle>(&sql)
            .bind(membership_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(cycles)
    }

    async fn insert_cycle(&mut self, membership_id: i64, cycle_number: i32) -> Result<StampCycle> {
        let sql = format!(
            r#"
            INSERT INTO stamp_cycles (membership_id, cycle_number, is_closed)
            VALUES ($1, $2, FALSE)
            RETURNING {}
            "#,
            CYCLE_COLUMNS
        );
        sqlx::query_as::<_, StampCycle>(&sql)
            .bind(membership_id)
            .bind(cycle_number)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| LoyaltyError::from_unique_violation(e, &cycle_number.to_string()))
    }

    async fn close_cycle(&mut self, cycle_id: i64) -> Result<()> {
        sqlx::query("UPDATE stamp_cycles SET is_closed = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(cycle_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    // ==================== 印花 ====================

    async fn count_stamps(&mut self, cycle_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stamps WHERE cycle_id = $1")
            .bind(cycle_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn list_stamps(&mut self, cycle_id: i64) -> Result<Vec<Stamp>> {
        let sql = format!(
            "SELECT {} FROM stamps s WHERE s.cycle_id = $1 ORDER BY s.number",
            STAMP_COLUMNS
        );
        let stamps = sqlx::query_as::<_, Stamp>(&sql)
            .bind(cycle_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(stamps)
    }

    async fn receipt_exists(&mut self, receipt: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM stamps WHERE pos_receipt_number = $1)")
                .bind(receipt)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(exists)
    }

    async fn insert_stamp(&mut self, new: &NewStamp) -> Result<Stamp> {
        let sql = format!(
            r#"
            INSERT INTO stamps AS s (cycle_id, number, reward_type, pos_receipt_number, transaction_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            STAMP_COLUMNS
        );
        let subject = new
            .pos_receipt_number
            .clone()
            .unwrap_or_else(|| new.number.to_string());
        sqlx::query_as::<_, Stamp>(&sql)
            .bind(new.cycle_id)
            .bind(new.number)
            .bind(new.reward_type)
            .bind(&new.pos_receipt_number)
            .bind(new.transaction_amount)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| LoyaltyError::from_unique_violation(e, &subject))
    }

    async fn lock_oldest_unredeemed(
        &mut self,
        membership_id: i64,
        reward_type: RewardType,
    ) -> Result<Option<Stamp>> {
        let sql = format!(
            r#"
            SELECT {} FROM stamps s
            JOIN stamp_cycles c ON c.id = s.cycle_id
            WHERE c.membership_id = $1 AND s.reward_type = $2 AND s.redeemed_at IS NULL
            ORDER BY c.cycle_number, s.number
            LIMIT 1
            FOR UPDATE OF s
            "#,
            STAMP_COLUMNS
        );
        let stamp = sqlx::query_as::<_, Stamp>(&sql)
            .bind(membership_id)
            .bind(reward_type)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(stamp)
    }

    async fn mark_redeemed(&mut self, stamp_id: i64, at: DateTime<Utc>) -> Result<Option<Stamp>> {
        let sql = format!(
            r#"
            UPDATE stamps s SET redeemed_at = $2, updated_at = NOW()
            WHERE s.id = $1 AND s.redeemed_at IS NULL
            RETURNING {}
            "#,
            STAMP_COLUMNS
        );
        let stamp = sqlx::query_as::<_, Stamp>(&sql)
            .bind(stamp_id)
            .bind(at)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(stamp)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
