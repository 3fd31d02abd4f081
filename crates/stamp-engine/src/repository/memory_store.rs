//! 内存存储
//!
//! 与 PostgreSQL 实现行为一致的内存仓储，适用于测试和本地开发。
//! 事务持有全局互斥锁并在工作副本上修改，提交时写回，drop 时丢弃（即回滚），
//! 因此所有事务完全串行。唯一约束与数据库 schema 保持一致（卡号不区分大小写）。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::traits::{LoyaltyStore, LoyaltyTx, ReportRepositoryTrait, SettingsSource};
use crate::error::{LoyaltyError, Result};
use crate::models::{
    CardSelector, Customer, DailyTransactions, DateRange, Membership, MembershipCard,
    MembershipStatus, NewCustomer, NewMembership, NewStamp, ProgramSettings, RewardType,
    SettingsPatch, Stamp, StampCycle,
};

/// 故障注入点
///
/// 下一次执行对应写操作时返回错误，用于验证事务回滚
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertMembership,
    BindCard,
    InsertCycle,
    InsertStamp,
}

/// 存储内容快照中的行数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub customers: usize,
    pub memberships: usize,
    pub cards: usize,
    pub assigned_cards: usize,
    pub cycles: usize,
    pub stamps: usize,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    settings: Option<ProgramSettings>,
    customers: BTreeMap<i64, Customer>,
    memberships: BTreeMap<i64, Membership>,
    cards: BTreeMap<i64, MembershipCard>,
    cycles: BTreeMap<i64, StampCycle>,
    stamps: BTreeMap<i64, Stamp>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn card_by_selector(&self, selector: &CardSelector) -> Option<&MembershipCard> {
        self.cards.values().find(|card| match selector {
            CardSelector::CardNumber(number) => card.card_number == *number,
            CardSelector::PublicId(public_id) => card.public_id == *public_id,
        })
    }

    fn cycle_number_of(&self, cycle_id: i64) -> i32 {
        self.cycles.get(&cycle_id).map_or(0, |c| c.cycle_number)
    }

    fn membership_of_stamp(&self, stamp: &Stamp) -> Option<i64> {
        self.cycles.get(&stamp.cycle_id).map(|c| c.membership_id)
    }
}

/// 内存仓储
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    defaults: ProgramSettings,
    fail_points: Arc<parking_lot::Mutex<HashSet<FailPoint>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(ProgramSettings::default())
    }
}

impl MemoryStore {
    /// 创建内存存储，`defaults` 为参数记录首次创建时的默认值
    pub fn new(defaults: ProgramSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            defaults,
            fail_points: Arc::new(parking_lot::Mutex::new(HashSet::new())),
        }
    }

    /// 让下一次对应写操作失败
    pub fn fail_next(&self, point: FailPoint) {
        self.fail_points.lock().insert(point);
    }

    /// 行数统计
    pub async fn stats(&self) -> MemoryStats {
        let state = self.state.lock().await;
        MemoryStats {
            customers: state.customers.len(),
            memberships: state.memberships.len(),
            cards: state.cards.len(),
            assigned_cards: state.cards.values().filter(|c| c.is_assigned).count(),
            cycles: state.cycles.len(),
            stamps: state.stamps.len(),
        }
    }

    /// 直接修改会员记录（模拟历史数据，如已过期的会员）
    pub async fn update_membership<F>(&self, id: i64, f: F) -> Result<Membership>
    where
        F: FnOnce(&mut Membership),
    {
        let mut state = self.state.lock().await;
        let membership = state
            .memberships
            .get_mut(&id)
            .ok_or_else(|| LoyaltyError::MembershipNotFound(id.to_string()))?;
        f(membership);
        Ok(membership.clone())
    }

    /// 直接修改印花记录（模拟历史数据）
    pub async fn update_stamp<F>(&self, id: i64, f: F) -> Result<Stamp>
    where
        F: FnOnce(&mut Stamp),
    {
        let mut state = self.state.lock().await;
        let stamp = state
            .stamps
            .get_mut(&id)
            .ok_or_else(|| LoyaltyError::Internal(format!("印花不存在: {}", id)))?;
        f(stamp);
        Ok(stamp.clone())
    }
}

#[async_trait]
impl LoyaltyStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            defaults: self.defaults.clone(),
            fail_points: self.fail_points.clone(),
        })
    }
}

#[async_trait]
impl SettingsSource for MemoryStore {
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

#[async_trait]
impl ReportRepositoryTrait for MemoryStore {
    async fn count_memberships(&self, range: &DateRange, status: MembershipStatus) -> Result<i64> {
        let state = self.state.lock().await;
        let count = state
            .memberships
            .values()
            .filter(|m| m.status == status && range.contains(m.created_at.date_naive()))
            .count();
        Ok(count as i64)
    }

    async fn count_redeemed(&self, range: &DateRange, reward_type: RewardType) -> Result<i64> {
        let state = self.state.lock().await;
        let count = state
            .stamps
            .values()
            .filter(|s| s.reward_type == reward_type)
            .filter(|s| s.redeemed_at.is_some_and(|at| range.contains(at.date_naive())))
            .count();
        Ok(count as i64)
    }

    async fn count_unredeemed(&self, range: &DateRange, reward_type: RewardType) -> Result<i64> {
        let state = self.state.lock().await;
        let count = state
            .stamps
            .values()
            .filter(|s| s.reward_type == reward_type && s.redeemed_at.is_none())
            .filter(|s| range.contains(s.created_at.date_naive()))
            .count();
        Ok(count as i64)
    }

    async fn daily_transactions(&self, range: &DateRange) -> Result<Vec<DailyTransactions>> {
        let state = self.state.lock().await;
        let mut daily: BTreeMap<_, DailyTransactions> = BTreeMap::new();
        for stamp in state.stamps.values() {
            let Some(amount) = stamp.transaction_amount else {
                continue;
            };
            let date = stamp.created_at.date_naive();
            if !range.contains(date) {
                continue;
            }
            let entry = daily.entry(date).or_insert_with(|| DailyTransactions {
                date,
                transaction_count: 0,
                total_amount: Default::default(),
            });
            entry.transaction_count += 1;
            entry.total_amount += amount;
        }
        Ok(daily.into_values().collect())
    }
}

/// 内存事务
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    defaults: ProgramSettings,
    fail_points: Arc<parking_lot::Mutex<HashSet<FailPoint>>>,
}

impl MemoryTx {
    fn check_fail_point(&self, point: FailPoint) -> Result<()> {
        if self.fail_points.lock().remove(&point) {
            return Err(LoyaltyError::Internal(format!("注入故障: {:?}", point)));
        }
        Ok(())
    }
}

#[async_trait]
impl LoyaltyTx for MemoryTx {
    // ==================== 计划参数 ====================

    async fn load_settings(&mut self) -> Result<ProgramSettings> {
        let defaults = &self.defaults;
        let settings = self.working.settings.get_or_insert_with(|| ProgramSettings {
            updated_at: Some(Utc::now()),
            ..defaults.clone()
        });
        Ok(settings.clone())
    }

    async fn lock_settings(&mut self) -> Result<ProgramSettings> {
        self.load_settings().await
    }

    async fn save_settings(&mut self, settings: &ProgramSettings) -> Result<ProgramSettings> {
        let saved = ProgramSettings {
            updated_at: Some(Utc::now()),
            ..settings.clone()
        };
        self.working.settings = Some(saved.clone());
        Ok(saved)
    }

    // ==================== 会员 ====================

    async fn get_membership(&mut self, id: i64) -> Result<Option<Membership>> {
        Ok(self.working.memberships.get(&id).cloned())
    }

    async fn lock_membership(&mut self, id: i64) -> Result<Option<Membership>> {
        Ok(self.working.memberships.get(&id).cloned())
    }

    async fn find_membership_by_card_number(
        &mut self,
        card_number: &str,
    ) -> Result<Option<Membership>> {
        Ok(self
            .working
            .memberships
            .values()
            .find(|m| m.card_number.eq_ignore_ascii_case(card_number))
            .cloned())
    }

    async fn find_latest_membership_by_phone(
        &mut self,
        phone: &str,
    ) -> Result<Option<Membership>> {
        let Some(customer_id) = self
            .working
            .customers
            .values()
            .find(|c| c.phone == phone)
            .map(|c| c.id)
        else {
            return Ok(None);
        };

        Ok(self
            .working
            .memberships
            .values()
            .filter(|m| m.customer_id == customer_id)
            .max_by_key(|m| (m.start_date, m.id))
            .cloned())
    }

    async fn insert_membership(&mut self, new: &NewMembership) -> Result<Membership> {
        self.check_fail_point(FailPoint::InsertMembership)?;
        if self
            .working
            .memberships
            .values()
            .any(|m| m.card_number.eq_ignore_ascii_case(&new.card_number))
        {
            return Err(LoyaltyError::CardNumberTaken(new.card_number.clone()));
        }

        let now = Utc::now();
        let membership = Membership {
            id: self.working.next_id(),
            customer_id: new.customer_id,
            card_number: new.card_number.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            status: MembershipStatus::Active,
            created_at: now,
            updated_at: now,
        };
        self.working
            .memberships
            .insert(membership.id, membership.clone());
        Ok(membership)
    }

    async fn update_membership_status(&mut self, id: i64, status: MembershipStatus) -> Result<()> {
        if let Some(membership) = self.working.memberships.get_mut(&id) {
            membership.status = status;
            membership.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_membership_card_number(&mut self, id: i64, card_number: &str) -> Result<()> {
        if self
            .working
            .memberships
            .values()
            .any(|m| m.id != id && m.card_number.eq_ignore_ascii_case(card_number))
        {
            return Err(LoyaltyError::CardNumberTaken(card_number.to_string()));
        }
        if let Some(membership) = self.working.memberships.get_mut(&id) {
            membership.card_number = card_number.to_string();
            membership.updated_at = Utc::now();
        }
        Ok(())
    }

    // ==================== 顾客 ====================

    async fn get_customer(&mut self, id: i64) -> Result<Option<Customer>> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn lock_customer_by_phone(&mut self, phone: &str) -> Result<Option<Customer>> {
        Ok(self
            .working
            .customers
            .values()
            .find(|c| c.phone == phone)
            .cloned())
    }

    async fn insert_customer(&mut self, new: &NewCustomer) -> Result<Option<Customer>> {
        if self.working.customers.values().any(|c| c.phone == new.phone) {
            return Ok(None);
        }

        let now = Utc::now();
        let customer = Customer {
            id: self.working.next_id(),
            name: new.name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            created_at: now,
            updated_at: now,
        };
        self.working.customers.insert(customer.id, customer.clone());
        Ok(Some(customer))
    }

    async fn update_customer_contact(
        &mut self,
        id: i64,
        name: &str,
        email: Option<&str>,
    ) -> Result<()> {
        if let Some(customer) = self.working.customers.get_mut(&id) {
            customer.name = name.to_string();
            customer.email = email.map(str::to_string);
            customer.updated_at = Utc::now();
        }
        Ok(())
    }

    // ==================== 会员卡 ====================

    async fn find_card(&mut self, selector: &CardSelector) -> Result<Option<MembershipCard>> {
        Ok(self.working.card_by_selector(selector).cloned())
    }

    async fn lock_card(&mut self, selector: &CardSelector) -> Result<Option<MembershipCard>> {
        Ok(self.working.card_by_selector(selector).cloned())
    }

    async fn find_card_by_membership(
        &mut self,
        membership_id: i64,
    ) -> Result<Option<MembershipCard>> {
        Ok(self
            .working
            .cards
            .values()
            .find(|c| c.membership_id == Some(membership_id))
            .cloned())
    }

    async fn card_number_exists(&mut self, card_number: &str) -> Result<bool> {
        Ok(self
            .working
            .cards
            .values()
            .any(|c| c.card_number.eq_ignore_ascii_case(card_number))
            || self
                .working
                .memberships
                .values()
                .any(|m| m.card_number.eq_ignore_ascii_case(card_number)))
    }

    async fn insert_card(&mut self, card_number: &str) -> Result<MembershipCard> {
        if self
            .working
            .cards
            .values()
            .any(|c| c.card_number.eq_ignore_ascii_case(card_number))
        {
            return Err(LoyaltyError::CardNumberTaken(card_number.to_string()));
        }

        let now = Utc::now();
        let card = MembershipCard {
            id: self.working.next_id(),
            public_id: Uuid::new_v4(),
            card_number: card_number.to_string(),
            is_assigned: false,
            membership_id: None,
            created_at: now,
            updated_at: now,
        };
        self.working.cards.insert(card.id, card.clone());
        Ok(card)
    }

    async fn bind_card(&mut self, card_id: i64, membership_id: i64) -> Result<()> {
        self.check_fail_point(FailPoint::BindCard)?;
        if self
            .working
            .cards
            .values()
            .any(|c| c.id != card_id && c.membership_id == Some(membership_id))
        {
            return Err(LoyaltyError::ConcurrencyConflict);
        }
        if let Some(card) = self.working.cards.get_mut(&card_id) {
            card.is_assigned = true;
            card.membership_id = Some(membership_id);
            card.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn unbind_card(&mut self, card_id: i64) -> Result<()> {
        if let Some(card) = self.working.cards.get_mut(&card_id) {
            card.is_assigned = false;
            card.membership_id = None;
            card.updated_at = Utc::now();
        }
        Ok(())
    }

    // ==================== 周期 ====================

    async fn list_cycles(&mut self, membership_id: i64) -> Result<Vec<StampCycle>> {
        let mut cycles: Vec<StampCycle> = self
            .working
            .cycles
            .values()
            .filter(|c| c.membership_id == membership_id)
            .cloned()
            .collect();
        cycles.sort_by_key(|c| c.cycle_number);
        Ok(cycles)
    }

    async fn insert_cycle(&mut self, membership_id: i64, cycle_number: i32) -> Result<StampCycle> {
        self.check_fail_point(FailPoint::InsertCycle)?;
        if self
            .working
            .cycles
            .values()
            .any(|c| c.membership_id == membership_id && c.cycle_number == cycle_number)
        {
            return Err(LoyaltyError::ConcurrencyConflict);
        }

        let now = Utc::now();
        let cycle = StampCycle {
            id: self.working.next_id(),
            membership_id,
            cycle_number,
            is_closed: false,
            created_at: now,
            updated_at: now,
        };
        self.working.cycles.insert(cycle.id, cycle.clone());
        Ok(cycle)
    }

    async fn close_cycle(&mut self, cycle_id: i64) -> Result<()> {
        if let Some(cycle) = self.working.cycles.get_mut(&cycle_id) {
            cycle.is_closed = true;
            cycle.updated_at = Utc::now();
        }
        Ok(())
    }

    // ==================== 印花 ====================

    async fn count_stamps(&mut self, cycle_id: i64) -> Result<i64> {
        let count = self
            .working
            .stamps
            .values()
            .filter(|s| s.cycle_id == cycle_id)
            .count();
        Ok(count as i64)
    }

    async fn list_stamps(&mut self, cycle_id: i64) -> Result<Vec<Stamp>> {
        let mut stamps: Vec<Stamp> = self
            .working
            .stamps
            .values()
            .filter(|s| s.cycle_id == cycle_id)
            .cloned()
            .collect();
        stamps.sort_by_key(|s| s.number);
        Ok(stamps)
    }

    async fn receipt_exists(&mut self, receipt: &str) -> Result<bool> {
        Ok(self
            .working
            .stamps
            .values()
            .any(|s| s.pos_receipt_number.as_deref() == Some(receipt)))
    }

    async fn insert_stamp(&mut self, new: &NewStamp) -> Result<Stamp> {
        self.check_fail_point(FailPoint::InsertStamp)?;
        if let Some(receipt) = new.pos_receipt_number.as_deref()
            && self
                .working
                .stamps
                .values()
                .any(|s| s.pos_receipt_number.as_deref() == Some(receipt))
        {
            return Err(LoyaltyError::DuplicateReceipt(receipt.to_string()));
        }
        if self
            .working
            .stamps
            .values()
            .any(|s| s.cycle_id == new.cycle_id && s.number == new.number)
        {
            return Err(LoyaltyError::ConcurrencyConflict);
        }

        let now = Utc::now();
        let stamp = Stamp {
            id: self.working.next_id(),
            cycle_id: new.cycle_id,
            number: new.number,
            reward_type: new.reward_type,
            redeemed_at: None,
            pos_receipt_number: new.pos_receipt_number.clone(),
            transaction_amount: new.transaction_amount,
            created_at: now,
            updated_at: now,
        };
        self.working.stamps.insert(stamp.id, stamp.clone());
        Ok(stamp)
    }

    async fn lock_oldest_unredeemed(
        &mut self,
        membership_id: i64,
        reward_type: RewardType,
    ) -> Result<Option<Stamp>> {
        let state = &self.working;
        Ok(state
            .stamps
            .values()
            .filter(|s| s.reward_type == reward_type && s.redeemed_at.is_none())
            .filter(|s| state.membership_of_stamp(s) == Some(membership_id))
            .min_by_key(|s| (state.cycle_number_of(s.cycle_id), s.number))
            .cloned())
    }

    async fn mark_redeemed(&mut self, stamp_id: i64, at: DateTime<Utc>) -> Result<Option<Stamp>> {
        match self.working.stamps.get_mut(&stamp_id) {
            Some(stamp) if stamp.redeemed_at.is_none() => {
                stamp.redeemed_at = Some(at);
                stamp.updated_at = Utc::now();
                Ok(Some(stamp.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn commit(self) -> Result<()> {
        let MemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}
