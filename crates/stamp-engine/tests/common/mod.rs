//! 服务测试公共夹具
//!
//! 基于 MemoryStore 组装全部服务，并提供开卡、发放印花等常用步骤

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use rust_decimal::Decimal;

use stamp_engine::models::{MembershipCard, MembershipDetail, ProgramSettings, Stamp, local_today};
use stamp_engine::repository::MemoryStore;
use stamp_engine::service::{
    ActivateCardRequest, AwardStampRequest, CardService, MembershipService, QueryService,
    RedemptionService, ReportService, StampAwardService,
};

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub award: StampAwardService<MemoryStore>,
    pub membership: MembershipService<MemoryStore>,
    pub cards: CardService<MemoryStore>,
    pub redemption: RedemptionService<MemoryStore>,
    pub query: QueryService<MemoryStore>,
    pub reports: ReportService<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(ProgramSettings::default())
    }

    pub fn with_settings(settings: ProgramSettings) -> Self {
        stamp_shared::observability::tracing::init_for_tests();
        let store = Arc::new(MemoryStore::new(settings));
        Self {
            award: StampAwardService::new(store.clone()),
            membership: MembershipService::new(store.clone()),
            cards: CardService::new(store.clone()),
            redemption: RedemptionService::new(store.clone()),
            query: QueryService::new(store.clone()),
            reports: ReportService::new(store.clone()),
            store,
        }
    }

    pub async fn issue_card(&self) -> MembershipCard {
        self.cards.issue_card(None).await.unwrap()
    }

    /// 发一张新卡并用随机顾客开卡
    pub async fn activate(&self) -> MembershipDetail {
        let card = self.issue_card().await;
        self.membership
            .activate_card(activation_request(&card.card_number, &random_phone()))
            .await
            .unwrap()
    }

    /// 按门槛金额发放一枚印花
    pub async fn award(&self, membership_id: i64) -> Option<Stamp> {
        self.award
            .award_stamp(AwardStampRequest::new(membership_id, amount(50_000)))
            .await
            .unwrap()
    }

    /// 连续发放 n 枚印花
    pub async fn award_times(&self, membership_id: i64, n: usize) -> Vec<Stamp> {
        let mut stamps = Vec::with_capacity(n);
        for _ in 0..n {
            stamps.push(self.award(membership_id).await.expect("应发放印花"));
        }
        stamps
    }
}

pub fn activation_request(card_number: &str, phone: &str) -> ActivateCardRequest {
    ActivateCardRequest {
        card_number: Some(card_number.to_string()),
        public_id: None,
        name: Name().fake(),
        phone: phone.to_string(),
        email: Some(SafeEmail().fake()),
    }
}

pub fn random_phone() -> String {
    format!("09{}", (10_000_000u32..99_999_999u32).fake::<u32>())
}

pub fn amount(value: i64) -> Decimal {
    Decimal::from(value)
}

pub fn days_ago(days: u64) -> NaiveDate {
    local_today().checked_sub_days(Days::new(days)).unwrap()
}

pub fn days_ahead(days: u64) -> NaiveDate {
    local_today().checked_add_days(Days::new(days)).unwrap()
}
