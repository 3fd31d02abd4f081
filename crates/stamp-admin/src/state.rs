//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态。状态对存储实现泛型：
//! 生产环境使用 PostgreSQL，测试使用内存存储。

use std::sync::Arc;

use stamp_engine::repository::{LoyaltyStore, ReportRepositoryTrait, SettingsSource};
use stamp_engine::service::{
    CardService, MembershipService, QueryService, RedemptionService, ReportService,
    SettingsService, StampAwardService,
};

/// 业务存储：事务工厂 + 参数读写
pub trait LoyaltyBackend: LoyaltyStore + SettingsSource {}

impl<T: LoyaltyStore + SettingsSource> LoyaltyBackend for T {}

/// 报表存储
pub trait ReportBackend: ReportRepositoryTrait + 'static {}

impl<T: ReportRepositoryTrait + 'static> ReportBackend for T {}

/// Axum 应用共享状态
///
/// 各服务通过 Arc 在 handler 间共享
pub struct AppState<S: LoyaltyBackend, R: ReportBackend> {
    pub award: Arc<StampAwardService<S>>,
    pub memberships: Arc<MembershipService<S>>,
    pub cards: Arc<CardService<S>>,
    pub redemption: Arc<RedemptionService<S>>,
    pub query: Arc<QueryService<S>>,
    pub settings: Arc<SettingsService<S>>,
    pub reports: Arc<ReportService<R>>,
}

impl<S: LoyaltyBackend, R: ReportBackend> AppState<S, R> {
    /// 创建新的应用状态
    pub fn new(store: Arc<S>, reports: Arc<R>) -> Self {
        Self {
            award: Arc::new(StampAwardService::new(store.clone())),
            memberships: Arc::new(MembershipService::new(store.clone())),
            cards: Arc::new(CardService::new(store.clone())),
            redemption: Arc::new(RedemptionService::new(store.clone())),
            query: Arc::new(QueryService::new(store.clone())),
            settings: Arc::new(SettingsService::new(store)),
            reports: Arc::new(ReportService::new(reports)),
        }
    }
}

// 手动实现：派生 Clone 会要求 S、R 本身可 Clone
impl<S: LoyaltyBackend, R: ReportBackend> Clone for AppState<S, R> {
    fn clone(&self) -> Self {
        Self {
            award: self.award.clone(),
            memberships: self.memberships.clone(),
            cards: self.cards.clone(),
            redemption: self.redemption.clone(),
            query: self.query.clone(),
            settings: self.settings.clone(),
            reports: self.reports.clone(),
        }
    }
}
