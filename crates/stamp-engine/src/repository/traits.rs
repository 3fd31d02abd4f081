//! 仓储 Trait 定义
//!
//! 引擎的所有写操作都在一个 [`LoyaltyTx`] 事务中完成：`lock_*` 方法在事务内
//! 加行锁，同一会员的并发操作因此串行化。事务对象未提交即被 drop 时回滚。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    CardSelector, Customer, DailyTransactions, DateRange, Membership, MembershipCard,
    MembershipStatus, NewCustomer, NewMembership, NewStamp, ProgramSettings, RewardType,
    SettingsPatch, Stamp, StampCycle,
};

/// 事务工厂
#[async_trait]
pub trait LoyaltyStore: Send + Sync + 'static {
    type Tx: LoyaltyTx;

    /// 开启事务
    async fn begin(&self) -> Result<Self::Tx>;
}

/// 事务内的数据访问
#[async_trait]
pub trait LoyaltyTx: Send + Sized {
    // 计划参数
    /// 读取参数，不存在时以默认值创建
    async fn load_settings(&mut self) -> Result<ProgramSettings>;
    /// 读取并锁定参数行，不存在时以默认值创建
    async fn lock_settings(&mut self) -> Result<ProgramSettings>;
    async fn save_settings(&mut self, settings: &ProgramSettings) -> Result<ProgramSettings>;

    // 会员
    async fn get_membership(&mut self, id: i64) -> Result<Option<Membership>>;
    /// 读取并锁定会员行（SELECT ... FOR UPDATE）
    async fn lock_membership(&mut self, id: i64) -> Result<Option<Membership>>;
    /// 按卡号查找会员（不区分大小写）
    async fn find_membership_by_card_number(&mut self, card_number: &str)
    -> Result<Option<Membership>>;
    /// 按顾客手机号查找最近开始的会员
    async fn find_latest_membership_by_phone(&mut self, phone: &str)
    -> Result<Option<Membership>>;
    async fn insert_membership(&mut self, new: &NewMembership) -> Result<Membership>;
    async fn update_membership_status(&mut self, id: i64, status: MembershipStatus) -> Result<()>;
    async fn update_membership_card_number(&mut self, id: i64, card_number: &str) -> Result<()>;

    // 顾客
    async fn get_customer(&mut self, id: i64) -> Result<Option<Customer>>;
    /// 按手机号读取并锁定顾客
    async fn lock_customer_by_phone(&mut self, phone: &str) -> Result<Option<Customer>>;
    /// 插入顾客；手机号已被占用（含并发事务刚提交的插入）时返回 `None`
    async fn insert_customer(&mut self, new: &NewCustomer) -> Result<Option<Customer>>;
    async fn update_customer_contact(
        &mut self,
        id: i64,
        name: &str,
        email: Option<&str>,
    ) -> Result<()>;

    // 会员卡
    async fn find_card(&mut self, selector: &CardSelector) -> Result<Option<MembershipCard>>;
    /// 读取并锁定卡片
    async fn lock_card(&mut self, selector: &CardSelector) -> Result<Option<MembershipCard>>;
    async fn find_card_by_membership(&mut self, membership_id: i64)
    -> Result<Option<MembershipCard>>;
    /// 卡号是否已被卡片或会员占用
    async fn card_number_exists(&mut self, card_number: &str) -> Result<bool>;
    async fn insert_card(&mut self, card_number: &str) -> Result<MembershipCard>;
    async fn bind_card(&mut self, card_id: i64, membership_id: i64) -> Result<()>;
    async fn unbind_card(&mut self, card_id: i64) -> Result<()>;

    // 周期
    /// 会员的全部周期，按 cycle_number 升序
    async fn list_cycles(&mut self, membership_id: i64) -> Result<Vec<StampCycle>>;
    async fn insert_cycle(&mut self, membership_id: i64, cycle_number: i32) -> Result<StampCycle>;
    async fn close_cycle(&mut self, cycle_id: i64) -> Result<()>;

    // 印花
    async fn count_stamps(&mut self, cycle_id: i64) -> Result<i64>;
    /// 周期内的印花，按 number 升序
    async fn list_stamps(&mut self, cycle_id: i64) -> Result<Vec<Stamp>>;
    async fn receipt_exists(&mut self, receipt: &str) -> Result<bool>;
    async fn insert_stamp(&mut self, new: &NewStamp) -> Result<Stamp>;
    /// 锁定会员最早获得的未核销奖励印花，按 (cycle_number, number) 升序
    async fn lock_oldest_unredeemed(
        &mut self,
        membership_id: i64,
        reward_type: RewardType,
    ) -> Result<Option<Stamp>>;
    /// 仅当 redeemed_at 为空时写入核销时间；已核销返回 `None`
    async fn mark_redeemed(&mut self, stamp_id: i64, at: DateTime<Utc>) -> Result<Option<Stamp>>;

    async fn commit(self) -> Result<()>;
}

/// 计划参数读写接口（参数缓存的数据源）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<ProgramSettings>;
    /// 在同一事务内锁定参数行、应用修改并保存
    async fn update(&self, patch: &SettingsPatch) -> Result<ProgramSettings>;
}

/// 报表仓储接口
///
/// 所有日期按 UTC 日历日与区间比较
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepositoryTrait: Send + Sync {
    /// 区间内创建的指定状态会员数
    async fn count_memberships(&self, range: &DateRange, status: MembershipStatus) -> Result<i64>;
    /// 区间内核销的指定奖励印花数（按 redeemed_at）
    async fn count_redeemed(&self, range: &DateRange, reward_type: RewardType) -> Result<i64>;
    /// 区间内获得且未核销的指定奖励印花数（按 created_at）
    async fn count_unredeemed(&self, range: &DateRange, reward_type: RewardType) -> Result<i64>;
    /// 带交易金额的印花按日汇总，日期升序
    async fn daily_transactions(&self, range: &DateRange) -> Result<Vec<DailyTransactions>>;
}
